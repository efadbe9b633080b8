use async_trait::async_trait;
use crate::errors::Result;
use super::state::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthProvider {
    Google,
    Facebook,
}

/// Pending phone sign-in, completed with the one-time code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneVerification {
    pub verification_id: String,
    pub phone_number: String,
}

/// Third-party identity service. Tokens stay on its side.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up_email(&self, email: &str, password: &str) -> Result<User>;

    async fn sign_in_email(&self, email: &str, password: &str) -> Result<User>;

    async fn sign_in_popup(&self, provider: OAuthProvider) -> Result<User>;

    async fn start_phone_sign_in(&self, phone_number: &str) -> Result<PhoneVerification>;

    async fn confirm_phone(&self, verification: &PhoneVerification, code: &str) -> Result<User>;

    async fn update_display_name(&self, display_name: &str) -> Result<()>;

    async fn send_email_verification(&self, user: &User) -> Result<()>;

    async fn send_password_reset(&self, email: &str) -> Result<()>;

    async fn sign_out(&self) -> Result<()>;
}
