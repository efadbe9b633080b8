mod store;
mod reconciler;

pub use store::{InMemoryLinkStore, LinkStore, RemoteLinkStore};
pub use reconciler::{DEFAULT_LINKS_TTL, LinkReconciler, Records};
