mod client;

pub use client::{ApiClient, AuthHook};
