mod manager;
mod provider;
mod state;

pub use manager::{SessionManager, UNAUTHENTICATED_ROUTE};
pub use provider::{IdentityProvider, OAuthProvider, PhoneVerification};
pub use state::{Session, SessionState, SessionSubscription, User};
