use std::sync::{Arc, Weak};
use async_trait::async_trait;
use tracing::{info, warn};
use crate::api::{ApiClient, AuthHook};
use crate::errors::Result;
use super::provider::{IdentityProvider, OAuthProvider, PhoneVerification};
use super::state::{SessionState, User};

/// Landing route after a forced logout
pub const UNAUTHENTICATED_ROUTE: &str = "/";

/// Keeps the identity provider, the backend session cookie and the shared
/// [`SessionState`] in step.
///
/// Registers itself as the [`ApiClient`] auth hook, so any rejected secured
/// call logs the user out.
pub struct SessionManager {
    provider: Arc<dyn IdentityProvider>,
    api: ApiClient,
    state: Arc<SessionState>,
}

impl SessionManager {
    pub fn new(provider: Arc<dyn IdentityProvider>, api: ApiClient, state: Arc<SessionState>) -> Arc<Self> {
        let manager = Arc::new(Self {
            provider,
            api,
            state,
        });

        let hook: Weak<SessionManager> = Arc::downgrade(&manager);
        manager.api.set_auth_hook(hook);
        manager
    }

    pub fn state(&self) -> &Arc<SessionState> {
        &self.state
    }

    pub fn user(&self) -> Option<User> {
        self.state.user()
    }

    /// Identity observer: mirror the provider's user into the backend session
    pub async fn on_auth_state_changed(&self, user: Option<User>) -> Result<()> {
        match user {
            Some(user) => {
                if let Err(err) = self.api.establish_session(user.email.as_deref()).await {
                    self.state.set_loading(false);
                    return Err(err);
                }
                info!(uid = %user.uid, "Session established");
                self.state.set_user(Some(user));
                Ok(())
            }
            None => {
                let email = self.state.user().and_then(|user| user.email);

                match self.api.end_session(email.as_deref()).await {
                    Ok(()) => {
                        self.state.set_user(None);
                        Ok(())
                    }
                    // cookie already gone
                    Err(err) if err.is_auth() => {
                        self.state.set_user(None);
                        Ok(())
                    }
                    Err(err) => {
                        self.state.set_loading(false);
                        Err(err)
                    }
                }
            }
        }
    }

    pub async fn sign_up_email(&self, email: &str, password: &str) -> Result<User> {
        self.state.set_loading(true);
        let user = self.provider.sign_up_email(email, password).await;
        self.signed_in(user).await
    }

    pub async fn sign_in_email(&self, email: &str, password: &str) -> Result<User> {
        self.state.set_loading(true);
        let user = self.provider.sign_in_email(email, password).await;
        self.signed_in(user).await
    }

    pub async fn sign_in_popup(&self, provider: OAuthProvider) -> Result<User> {
        self.state.set_loading(true);
        let user = self.provider.sign_in_popup(provider).await;
        self.signed_in(user).await
    }

    pub async fn start_phone_sign_in(&self, phone_number: &str) -> Result<PhoneVerification> {
        self.state.set_loading(true);
        let verification = self.provider.start_phone_sign_in(phone_number).await;
        self.state.set_loading(false);
        verification
    }

    pub async fn confirm_phone(&self, verification: &PhoneVerification, code: &str) -> Result<User> {
        self.state.set_loading(true);
        let user = self.provider.confirm_phone(verification, code).await;
        self.signed_in(user).await
    }

    pub async fn update_display_name(&self, display_name: &str) -> Result<()> {
        self.provider.update_display_name(display_name).await?;

        if let Some(mut user) = self.state.user() {
            user.display_name = Some(display_name.to_string());
            self.state.set_user(Some(user));
        }
        Ok(())
    }

    pub async fn send_email_verification(&self, user: &User) -> Result<()> {
        self.provider.send_email_verification(user).await
    }

    pub async fn send_password_reset(&self, email: &str) -> Result<()> {
        self.provider.send_password_reset(email).await
    }

    pub async fn logout(&self) -> Result<()> {
        self.state.set_loading(true);
        if let Err(err) = self.provider.sign_out().await {
            self.state.set_loading(false);
            return Err(err);
        }

        self.on_auth_state_changed(None).await
    }

    async fn signed_in(&self, user: Result<User>) -> Result<User> {
        match user {
            Ok(user) => {
                self.on_auth_state_changed(Some(user.clone())).await?;
                Ok(user)
            }
            Err(err) => {
                self.state.set_loading(false);
                Err(err)
            }
        }
    }
}

#[async_trait]
impl AuthHook for SessionManager {
    async fn on_unauthorized(&self, status_code: u16) {
        warn!(status = status_code, "Backend rejected session, logging out");

        if let Err(err) = self.logout().await {
            warn!(error = %err, "Logout during teardown failed");
        }
        self.state.teardown(UNAUTHENTICATED_ROUTE);
    }
}
