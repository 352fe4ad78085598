//! Current-session hub. One watch channel holds the signed-in user, if any;
//! the shell subscribes at startup and reacts when it is cleared.

use crate::features::auth::CompletedSession;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Clone)]
pub struct SessionHub {
    current: Arc<watch::Sender<Option<CompletedSession>>>,
}

impl SessionHub {
    #[must_use]
    pub fn new() -> Self {
        let (current, _) = watch::channel(None);
        Self {
            current: Arc::new(current),
        }
    }

    #[must_use]
    pub fn current(&self) -> Option<CompletedSession> {
        self.current.borrow().clone()
    }

    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.current.borrow().is_some()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<CompletedSession>> {
        self.current.subscribe()
    }

    pub fn set(&self, session: CompletedSession) {
        self.current.send_replace(Some(session));
    }

    pub fn clear(&self) {
        self.current.send_if_modified(|current| current.take().is_some());
    }
}

impl Default for SessionHub {
    fn default() -> Self {
        Self::new()
    }
}
