//! In-memory registry of live sessions.
//!
//! A thin concurrent map from [`SessionId`] to [`Session`] for embedders
//! running many tables at once. Access goes through
//! [`with_session`](SessionRegistry::with_session), which holds the entry
//! lock for the duration of the closure; a session is only ever driven by
//! one moderator, so contention is per-table and short.

use dashmap::DashMap;

use crate::session::{PlayerId, Session, SessionId};

/// Concurrent registry of live sessions, keyed by session id.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<SessionId, Session>,
}

impl SessionRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a fresh session for the given seating and registers it.
    pub fn create(&self, seating: Vec<PlayerId>) -> SessionId {
        let session = Session::new(seating);
        let id = session.id();
        self.sessions.insert(id, session);
        id
    }

    /// Registers an existing session (e.g. one restored from disk).
    ///
    /// Replaces and returns any session already stored under the same id.
    pub fn insert(&self, session: Session) -> Option<Session> {
        self.sessions.insert(session.id(), session)
    }

    /// Removes and returns a session.
    pub fn remove(&self, id: SessionId) -> Option<Session> {
        self.sessions.remove(&id).map(|(_, session)| session)
    }

    /// Returns `true` if a session is registered under `id`.
    #[must_use]
    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.contains_key(&id)
    }

    /// Number of registered sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if no sessions are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Runs `f` with exclusive access to the session, if it exists.
    ///
    /// The entry lock is held for the duration of `f`; do not call back
    /// into the registry from inside the closure.
    pub fn with_session<R>(
        &self,
        id: SessionId,
        f: impl FnOnce(&mut Session) -> R,
    ) -> Option<R> {
        self.sessions.get_mut(&id).map(|mut entry| f(&mut entry))
    }
}

// ============================================================================
// Tests
// ============================================================================
