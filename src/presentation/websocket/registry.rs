//! Group Registry
//!
//! Maps group names to the sessions subscribed to them. Each group has its
//! own lock: subscribe, unsubscribe and publish on one group are serialized,
//! while different groups proceed in parallel. Groups are created on first
//! subscribe and dropped once empty.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

use super::session::{SessionId, SessionSink};
use crate::application::{GroupMirror, ServerEvent};
use crate::domain::GroupName;
use crate::infrastructure::metrics;

#[derive(Default)]
struct Group {
    members: Mutex<HashMap<SessionId, SessionSink>>,
}

pub struct GroupRegistry {
    groups: DashMap<GroupName, Arc<Group>>,
    mirror: Option<Arc<dyn GroupMirror>>,
}

impl GroupRegistry {
    pub fn new(mirror: Option<Arc<dyn GroupMirror>>) -> Self {
        Self {
            groups: DashMap::new(),
            mirror,
        }
    }

    /// Add a session to a group. Subscribing twice is a no-op.
    pub fn subscribe(&self, group: GroupName, sink: &SessionSink) {
        {
            // The entry guard keeps the group from being collected until the
            // member is in.
            let entry = self.groups.entry(group).or_default();
            entry
                .members
                .lock()
                .insert(sink.session_id, sink.clone());
        }
        metrics::set_active_groups(self.groups.len());
        tracing::trace!(group = %group, session_id = %sink.session_id, "Subscribed");
    }

    /// Remove a session from a group. Once this returns, the session receives
    /// nothing further from the group.
    pub fn unsubscribe(&self, group: GroupName, session_id: SessionId) {
        if let Some(entry) = self.groups.get(&group) {
            entry.members.lock().remove(&session_id);
        }
        self.groups
            .remove_if(&group, |_, g| g.members.lock().is_empty());
        metrics::set_active_groups(self.groups.len());
        tracing::trace!(group = %group, session_id = %session_id, "Unsubscribed");
    }

    /// Deliver an event to every current subscriber except `exclude`.
    /// Returns the number of sessions it was queued for. Publishing to an
    /// unknown group delivers nothing.
    pub fn publish(&self, group: GroupName, event: ServerEvent, exclude: Option<SessionId>) -> usize {
        let target = self.groups.get(&group).map(|entry| Arc::clone(entry.value()));
        let event = Arc::new(event);

        let Some(target) = target else {
            if let Some(mirror) = &self.mirror {
                mirror.mirror(&group, &event);
            }
            return 0;
        };

        let members = target.members.lock();
        let mut delivered = 0;
        for sink in members.values() {
            if Some(sink.session_id) == exclude {
                continue;
            }
            if sink.deliver(Arc::clone(&event)) {
                delivered += 1;
            }
        }
        if let Some(mirror) = &self.mirror {
            mirror.mirror(&group, &event);
        }
        drop(members);

        metrics::record_deliveries(event.event_name(), delivered);
        tracing::trace!(group = %group, event = event.event_name(), delivered, "Published");
        delivered
    }

    pub fn subscriber_count(&self, group: GroupName) -> usize {
        self.groups
            .get(&group)
            .map(|entry| entry.members.lock().len())
            .unwrap_or(0)
    }

    pub fn is_subscribed(&self, group: GroupName, session_id: SessionId) -> bool {
        self.groups
            .get(&group)
            .map(|entry| entry.members.lock().contains_key(&session_id))
            .unwrap_or(false)
    }

    /// Number of non-empty groups
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }
}

impl Default for GroupRegistry {
    fn default() -> Self {
        Self::new(None)
    }
}
