use tokio::sync::watch;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct User {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: Option<User>,
    /// True until the first identity callback lands, and while a sign-in runs
    pub loading: bool,
    /// Where the front end should navigate after a forced teardown
    pub redirect: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            user: None,
            loading: true,
            redirect: None,
        }
    }
}

/// The one "current user or none" signal.
///
/// Consumers hold a [`SessionSubscription`] rather than reaching for a global.
#[derive(Debug)]
pub struct SessionState {
    tx: watch::Sender<Session>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Session::default());
        Self { tx }
    }

    pub fn current(&self) -> Session {
        self.tx.borrow().clone()
    }

    pub fn user(&self) -> Option<User> {
        self.tx.borrow().user.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.tx.borrow().loading
    }

    pub fn redirect(&self) -> Option<String> {
        self.tx.borrow().redirect.clone()
    }

    pub fn subscribe(&self) -> SessionSubscription {
        SessionSubscription {
            rx: self.tx.subscribe(),
        }
    }

    pub fn set_loading(&self, loading: bool) {
        self.tx.send_if_modified(|session| {
            let changed = session.loading != loading;
            session.loading = loading;
            changed
        });
    }

    /// Publish the settled identity; always ends loading
    pub fn set_user(&self, user: Option<User>) {
        self.tx.send_modify(|session| {
            session.user = user;
            session.loading = false;
        });
    }

    pub fn teardown(&self, redirect: &str) {
        self.tx.send_modify(|session| {
            session.user = None;
            session.loading = false;
            session.redirect = Some(redirect.to_string());
        });
    }

    /// Consume the pending redirect, if any
    pub fn take_redirect(&self) -> Option<String> {
        let mut redirect = None;
        self.tx.send_if_modified(|session| {
            redirect = session.redirect.take();
            redirect.is_some()
        });
        redirect
    }
}

/// Capability handle on a [`SessionState`]; dropping it detaches
#[derive(Debug)]
pub struct SessionSubscription {
    rx: watch::Receiver<Session>,
}

impl SessionSubscription {
    /// Wait for the next change. `None` once the state is gone.
    pub async fn changed(&mut self) -> Option<Session> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    pub fn current(&self) -> Session {
        self.rx.borrow().clone()
    }

    pub fn unsubscribe(self) {}
}
