//! Presence tracking
//!
//! A user is online while at least one of their connections is open. Each
//! user has a connection counter behind its own async lock. A connect or
//! disconnect hands back a [`PresenceTransition`] that still holds that lock,
//! so the caller announces the transition before the next one for the same
//! user can be decided. Announcements therefore reach rooms in the same order
//! the transitions happened.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::StorageGateway;

type Counters = DashMap<i64, Arc<Mutex<usize>>>;

/// Transition produced by a connect or disconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceChange {
    WentOnline,
    WentOffline,
    Unchanged,
}

/// A decided transition whose per-user lock is still held.
///
/// Dropping it releases the lock and collects the counter once it is idle.
pub struct PresenceTransition {
    change: PresenceChange,
    user_id: i64,
    guard: Option<OwnedMutexGuard<usize>>,
    counts: Arc<Counters>,
}

impl PresenceTransition {
    pub fn change(&self) -> PresenceChange {
        self.change
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }
}

impl Drop for PresenceTransition {
    fn drop(&mut self) {
        let Some(guard) = self.guard.take() else {
            return;
        };
        let idle = *guard == 0;
        drop(guard);
        if idle {
            collect(&self.counts, self.user_id);
        }
    }
}

impl std::fmt::Debug for PresenceTransition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresenceTransition")
            .field("user_id", &self.user_id)
            .field("change", &self.change)
            .finish()
    }
}

pub struct PresenceTracker {
    counts: Arc<Counters>,
    storage: Arc<dyn StorageGateway>,
}

impl PresenceTracker {
    pub fn new(storage: Arc<dyn StorageGateway>) -> Self {
        Self {
            counts: Arc::new(DashMap::new()),
            storage,
        }
    }

    /// Register a new connection. The first one marks the user online.
    ///
    /// The in-memory count is authoritative; a failed storage write is logged
    /// and the transition is still reported.
    pub async fn on_connect(&self, user_id: i64) -> PresenceTransition {
        let mut count = self.slot(user_id).lock_owned().await;
        *count += 1;

        let change = if *count > 1 {
            PresenceChange::Unchanged
        } else {
            if let Err(e) = self.storage.set_presence(user_id, true).await {
                tracing::warn!(user_id, error = %e, "Failed to persist online presence");
            }
            tracing::debug!(user_id, "User went online");
            PresenceChange::WentOnline
        };

        self.transition(user_id, change, Some(count))
    }

    /// Release a connection. Reaching zero marks the user offline and
    /// records last-seen. Extra calls at zero are no-ops.
    pub async fn on_disconnect(&self, user_id: i64) -> PresenceTransition {
        let Some(slot) = self.counts.get(&user_id).map(|entry| Arc::clone(entry.value())) else {
            return self.transition(user_id, PresenceChange::Unchanged, None);
        };

        let mut count = slot.lock_owned().await;
        let change = match *count {
            0 => PresenceChange::Unchanged,
            1 => {
                *count = 0;
                if let Err(e) = self.storage.set_presence(user_id, false).await {
                    tracing::warn!(user_id, error = %e, "Failed to persist offline presence");
                }
                tracing::debug!(user_id, "User went offline");
                PresenceChange::WentOffline
            }
            _ => {
                *count -= 1;
                PresenceChange::Unchanged
            }
        };

        self.transition(user_id, change, Some(count))
    }

    /// Current number of open connections for a user.
    pub async fn connection_count(&self, user_id: i64) -> usize {
        match self.counts.get(&user_id).map(|entry| Arc::clone(entry.value())) {
            Some(slot) => *slot.lock().await,
            None => 0,
        }
    }

    pub fn tracked_users(&self) -> usize {
        self.counts.len()
    }

    fn slot(&self, user_id: i64) -> Arc<Mutex<usize>> {
        Arc::clone(self.counts.entry(user_id).or_default().value())
    }

    fn transition(
        &self,
        user_id: i64,
        change: PresenceChange,
        guard: Option<OwnedMutexGuard<usize>>,
    ) -> PresenceTransition {
        PresenceTransition {
            change,
            user_id,
            guard,
            counts: Arc::clone(&self.counts),
        }
    }
}

/// Drop an idle counter. Only removed when nobody else holds it.
fn collect(counts: &Counters, user_id: i64) {
    counts.remove_if(&user_id, |_, slot| {
        Arc::strong_count(slot) == 1 && slot.try_lock().map(|count| *count == 0).unwrap_or(false)
    });
}
