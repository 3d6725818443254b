use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::{Mutex, RwLock};

use crate::models::UserId;

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("no active session")]
    Missing,
    #[error("session token is empty")]
    EmptyToken,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user_id: UserId,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn(UserId),
    Invalidated { reason: String },
}

/// Holds the credentials handed over by the host's session storage.
///
/// Invalidation is broadcast to subscribers instead of forcing a reload, so
/// the host decides where to send the user next.
#[derive(Default)]
pub struct Manager {
    active: RwLock<Option<Credentials>>,
    listeners: Mutex<Vec<Sender<SessionEvent>>>,
}

impl Manager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credentials(credentials: Credentials) -> Self {
        Self {
            active: RwLock::new(Some(credentials)),
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn sign_in(&self, credentials: Credentials) {
        let user_id = credentials.user_id;
        *self.active.write() = Some(credentials);
        log::info!("session: signed in as user {user_id}");
        self.broadcast(SessionEvent::SignedIn(user_id));
    }

    pub fn current(&self) -> Option<Credentials> {
        self.active.read().clone()
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.active.read().as_ref().map(|creds| creds.user_id)
    }

    /// Credentials for an action that cannot proceed anonymously.
    pub fn require(&self) -> Result<Credentials, SessionError> {
        let creds = self.current().ok_or(SessionError::Missing)?;
        if creds.token.trim().is_empty() {
            return Err(SessionError::EmptyToken);
        }
        Ok(creds)
    }

    pub fn invalidate(&self, reason: &str) {
        let previous = self.active.write().take();
        if previous.is_none() {
            return;
        }
        log::warn!("session: invalidated ({reason})");
        self.broadcast(SessionEvent::Invalidated {
            reason: reason.to_string(),
        });
    }

    pub fn subscribe(&self) -> Receiver<SessionEvent> {
        let (tx, rx) = unbounded();
        self.listeners.lock().push(tx);
        rx
    }

    fn broadcast(&self, event: SessionEvent) {
        self.listeners
            .lock()
            .retain(|listener| listener.send(event.clone()).is_ok());
    }
}
