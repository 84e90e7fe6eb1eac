//! Redis group mirror
//!
//! Copies every published event to a Redis channel named `{prefix}{group}`.
//! The registry calls [`GroupMirror::mirror`] while holding the group lock, so
//! this side only serializes and enqueues; a single task drains the queue and
//! issues `PUBLISH` in order.

use redis::aio::ConnectionManager;
use serde_json::json;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::application::{GroupMirror, ServerEvent};
use crate::domain::GroupName;

/// One queued `PUBLISH`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirroredEvent {
    pub channel: String,
    pub payload: String,
}

/// [`GroupMirror`] that forwards events to Redis pub/sub.
pub struct RedisGroupMirror {
    prefix: String,
    queue: mpsc::UnboundedSender<MirroredEvent>,
}

impl RedisGroupMirror {
    /// Create the mirror and the receiving end of its queue.
    pub fn new(prefix: impl Into<String>) -> (Self, mpsc::UnboundedReceiver<MirroredEvent>) {
        let (queue, rx) = mpsc::unbounded_channel();
        (
            Self {
                prefix: prefix.into(),
                queue,
            },
            rx,
        )
    }

    /// Create the mirror and spawn its publisher task.
    pub fn spawn(conn: ConnectionManager, prefix: impl Into<String>) -> (Self, JoinHandle<()>) {
        let (mirror, rx) = Self::new(prefix);
        let handle = tokio::spawn(run_publisher(conn, rx));
        (mirror, handle)
    }

    fn envelope(&self, group: &GroupName, event: &ServerEvent) -> Result<MirroredEvent, serde_json::Error> {
        let payload = serde_json::to_string(&json!({
            "group": group,
            "event": event,
        }))?;
        Ok(MirroredEvent {
            channel: format!("{}{}", self.prefix, group),
            payload,
        })
    }
}

impl GroupMirror for RedisGroupMirror {
    fn mirror(&self, group: &GroupName, event: &ServerEvent) {
        match self.envelope(group, event) {
            Ok(item) => {
                if self.queue.send(item).is_err() {
                    tracing::warn!(group = %group, "Mirror publisher stopped, dropping event");
                }
            }
            Err(e) => {
                tracing::warn!(group = %group, error = %e, "Failed to encode mirrored event");
            }
        }
    }
}

/// Drain the queue and `PUBLISH` each event. Failures are logged and skipped.
pub async fn run_publisher(mut conn: ConnectionManager, mut rx: mpsc::UnboundedReceiver<MirroredEvent>) {
    while let Some(item) = rx.recv().await {
        let result = redis::cmd("PUBLISH")
            .arg(&item.channel)
            .arg(&item.payload)
            .query_async::<i64>(&mut conn)
            .await;

        match result {
            Ok(receivers) => {
                tracing::trace!(channel = %item.channel, receivers, "Mirrored event");
            }
            Err(e) => {
                crate::infrastructure::metrics::MIRROR_FAILURES_TOTAL.inc();
                tracing::warn!(channel = %item.channel, error = %e, "Failed to mirror event");
            }
        }
    }
    tracing::debug!("Mirror publisher finished");
}
