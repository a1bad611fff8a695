//! The Roster - shared registry of live sessions and broadcast fan-out.

use crate::state::session::{SessionHandle, SessionId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

/// Shared registry of live sessions.
///
/// One mutex guards the membership map, and `broadcast` holds it for the
/// whole fan-out pass: every pass sees a consistent snapshot of members,
/// passes are serialized, and each recipient therefore receives lines in
/// the order the roster issued them. All sends inside the pass are
/// non-blocking, so the critical section stays short even with a stalled
/// peer on the other end.
pub struct Roster {
    sessions: Mutex<HashMap<SessionId, SessionHandle>>,
}

impl Roster {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Add a session to the roster.
    ///
    /// Returns `false` if the id was already registered, in which case the
    /// existing entry is left untouched.
    pub fn register(&self, handle: SessionHandle) -> bool {
        let mut sessions = self.sessions.lock();
        match sessions.entry(handle.id) {
            Entry::Occupied(_) => {
                warn!(sid = %handle.id, "Session already registered");
                false
            }
            Entry::Vacant(slot) => {
                debug!(sid = %handle.id, "Session registered");
                slot.insert(handle);
                true
            }
        }
    }

    /// Remove a session from the roster. Removing an unknown id is a no-op.
    pub fn unregister(&self, id: SessionId) -> bool {
        let removed = self.sessions.lock().remove(&id).is_some();
        if removed {
            debug!(sid = %id, "Session unregistered");
        }
        removed
    }

    /// Relay one line to every registered session.
    ///
    /// A failed recipient never aborts the pass: a session whose outbound
    /// queue is full or closed is logged and removed before the pass ends,
    /// and its connection task observes the dropped channel and unwinds on
    /// its own. The caller never sees an error.
    pub fn broadcast(&self, line: &str) {
        let line: Arc<str> = Arc::from(line);
        let mut sessions = self.sessions.lock();
        let mut failed: Vec<SessionId> = Vec::new();

        for (id, handle) in sessions.iter() {
            match handle.outbound.try_send(Arc::clone(&line)) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!(sid = %id, "Outbound queue full, dropping session");
                    failed.push(*id);
                }
                Err(TrySendError::Closed(_)) => {
                    warn!(sid = %id, "Outbound channel closed, dropping session");
                    failed.push(*id);
                }
            }
        }

        for id in failed {
            sessions.remove(&id);
        }
    }

    /// Number of registered sessions.
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }

    /// Whether the given session is currently registered.
    #[allow(dead_code)]
    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.lock().contains_key(&id)
    }
}

impl Default for Roster {
    fn default() -> Self {
        Self::new()
    }
}
