//! Session and subscriber bookkeeping structs.

use closeloop_types::{CallLifecycle, StreamEvent, TranscriptFragment};
use std::fmt;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Opaque handle identifying one push-stream subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(pub(crate) Uuid);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One live call's relay state: its transcript history and lifecycle.
#[derive(Debug)]
pub struct CallSession {
    /// Ordered, append-only transcript history.
    pub fragments: Vec<TranscriptFragment>,
    /// Creation timestamp (RFC 3339).
    pub created_at: String,
    /// Lifecycle state; flips to `Ended` on `conversation.ended`.
    pub lifecycle: CallLifecycle,
    /// Generation number for stale-eviction detection.
    generation: u64,
}

impl CallSession {
    pub(crate) fn new(generation: u64) -> Self {
        Self {
            fragments: Vec::new(),
            created_at: chrono::Utc::now().to_rfc3339(),
            lifecycle: CallLifecycle::Active,
            generation,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// A registered delivery sink for one subscriber connection.
pub(crate) struct Subscriber {
    pub(crate) id: SubscriberId,
    pub(crate) sender: mpsc::Sender<StreamEvent>,
}
