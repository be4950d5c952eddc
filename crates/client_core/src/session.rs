//! Session seam: the bearer credential and cached user record supplied by the auth layer.

use std::sync::RwLock;

use shared::domain::UserRecord;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user: Option<UserRecord>,
}

impl Session {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            user: None,
        }
    }

    pub fn with_user(mut self, user: UserRecord) -> Self {
        self.user = Some(user);
        self
    }
}

pub trait SessionAccessor: Send + Sync {
    fn get(&self) -> Option<Session>;
    fn clear(&self);
    /// Replaces the cached user record of the current session, if any.
    fn set_user(&self, user: UserRecord);
}

#[derive(Default)]
pub struct InMemorySession {
    inner: RwLock<Option<Session>>,
}

impl InMemorySession {
    pub fn signed_in(session: Session) -> Self {
        Self {
            inner: RwLock::new(Some(session)),
        }
    }

    pub fn signed_out() -> Self {
        Self::default()
    }

    pub fn sign_in(&self, session: Session) {
        match self.inner.write() {
            Ok(mut guard) => *guard = Some(session),
            Err(poisoned) => *poisoned.into_inner() = Some(session),
        }
    }
}

impl SessionAccessor for InMemorySession {
    fn get(&self) -> Option<Session> {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn clear(&self) {
        match self.inner.write() {
            Ok(mut guard) => *guard = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
    }

    fn set_user(&self, user: UserRecord) {
        let mut guard = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(session) = guard.as_mut() {
            session.user = Some(user);
        }
    }
}
