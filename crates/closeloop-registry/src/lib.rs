//! In-process call-session registry: the relay core of Closeloop.
//!
//! Owns all live-call state: the bidirectional mapping between the telephony
//! call SID and the voice platform's conversation id, each session's
//! append-only transcript history, and the per-call set of push-stream
//! subscribers. Constructed once at startup and handed to every handler —
//! there is no global state.
//!
//! # Contract
//!
//! Every operation is infallible from the caller's point of view: unknown
//! identifiers degrade to identity results, empty lists, or no-ops. The
//! registry is an ephemeral relay, not a system of record — favoring
//! availability over strict validation is deliberate, because webhook
//! delivery order across the telephony and voice platforms is not
//! guaranteed.
//!
//! # Concurrency
//!
//! Interior state lives behind a single `std::sync::RwLock`. All critical
//! sections are brief map operations that never span an `.await` point
//! (fan-out uses non-blocking `try_send`), so a synchronous lock is safe
//! and cheaper than `tokio::sync::RwLock`. Fragments are delivered to each
//! subscriber in append order; a subscriber whose channel is closed or full
//! is dropped during fan-out so one stuck browser cannot stall the rest.

mod session;

pub use session::{CallSession, SubscriberId};

use closeloop_types::{CallLifecycle, StreamEvent, TranscriptFragment};
use session::Subscriber;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

#[derive(Default)]
struct RegistryState {
    /// call SID -> conversation id.
    call_to_conversation: HashMap<String, String>,
    /// conversation id -> call SID.
    conversation_to_call: HashMap<String, String>,
    /// call SID -> session (transcript history + lifecycle).
    sessions: HashMap<String, CallSession>,
    /// call SID -> active push-stream subscribers.
    subscribers: HashMap<String, Vec<Subscriber>>,
}

/// Process-wide session registry. Cheap to clone; all clones share state.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    state: Arc<RwLock<RegistryState>>,
    /// Source of session generation numbers. Eviction timers capture the
    /// generation they were scheduled against and fire only if it still
    /// matches, so a call SID reused by a new session survives a stale
    /// timer from its predecessor.
    generation: Arc<AtomicU64>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Establishes the bidirectional call SID <-> conversation id link.
    ///
    /// Re-registering the same pair is a no-op; a conflicting pair
    /// overwrites the previous link (last-writer-wins). Stale reverse
    /// entries from an overwritten link are removed so the mapping stays
    /// 1:1 in both directions.
    pub fn register_mapping(&self, call_sid: &str, conversation_id: &str) {
        let mut state = self.write();
        if let Some(old_conversation) = state
            .call_to_conversation
            .insert(call_sid.to_string(), conversation_id.to_string())
        {
            if old_conversation != conversation_id {
                state.conversation_to_call.remove(&old_conversation);
            }
        }
        if let Some(old_call) = state
            .conversation_to_call
            .insert(conversation_id.to_string(), call_sid.to_string())
        {
            if old_call != call_sid {
                state.call_to_conversation.remove(&old_call);
            }
        }

        // Events that arrive before the mapping is known may have created a
        // session keyed by the conversation id. Fold it into the canonical
        // call-SID session so its transcript and subscribers are not
        // stranded under a key no eviction timer covers.
        if call_sid != conversation_id {
            if let Some(orphan) = state.sessions.remove(conversation_id) {
                if let Some(session) = state.sessions.get_mut(call_sid) {
                    session.fragments.extend(orphan.fragments);
                } else {
                    state.sessions.insert(call_sid.to_string(), orphan);
                }
                tracing::debug!(
                    call_sid,
                    conversation_id,
                    "merged pre-mapping session into call session"
                );
            }
            if let Some(orphan_sinks) = state.subscribers.remove(conversation_id) {
                state
                    .subscribers
                    .entry(call_sid.to_string())
                    .or_default()
                    .extend(orphan_sinks);
            }
        }
        tracing::debug!(call_sid, conversation_id, "registered call mapping");
    }

    /// Resolves either identifier to its paired identifier.
    ///
    /// Falls back to returning the input unchanged when no mapping exists —
    /// callers treat the result as the canonical session id either way.
    pub fn resolve(&self, id: &str) -> String {
        let state = self.read();
        if let Some(call_sid) = state.conversation_to_call.get(id) {
            return call_sid.clone();
        }
        if let Some(conversation_id) = state.call_to_conversation.get(id) {
            return conversation_id.clone();
        }
        id.to_string()
    }

    /// Creates an empty session for the call if one does not exist yet.
    pub fn ensure_session(&self, call_sid: &str) {
        let generation = &self.generation;
        let mut state = self.write();
        state
            .sessions
            .entry(call_sid.to_string())
            .or_insert_with(|| CallSession::new(generation.fetch_add(1, Ordering::Relaxed)));
    }

    /// Appends a fragment to the session's transcript (creating the session
    /// on first use) and immediately fans it out to every current
    /// subscriber for the call.
    pub fn append_fragment(&self, call_sid: &str, fragment: TranscriptFragment) {
        let event = StreamEvent::Transcript {
            session_id: call_sid.to_string(),
            data: fragment.clone(),
        };

        let generation = &self.generation;
        let mut state = self.write();
        let session = state
            .sessions
            .entry(call_sid.to_string())
            .or_insert_with(|| CallSession::new(generation.fetch_add(1, Ordering::Relaxed)));
        session.fragments.push(fragment);
        Self::fan_out(&mut state, call_sid, &event);
    }

    /// Returns the full ordered transcript, or empty if the session is
    /// unknown or already evicted.
    pub fn fragments(&self, call_sid: &str) -> Vec<TranscriptFragment> {
        self.read()
            .sessions
            .get(call_sid)
            .map(|s| s.fragments.clone())
            .unwrap_or_default()
    }

    /// Returns the session's lifecycle state, if the session exists.
    pub fn lifecycle(&self, call_sid: &str) -> Option<CallLifecycle> {
        self.read().sessions.get(call_sid).map(|s| s.lifecycle)
    }

    /// Registers a delivery sink for the call's stream events.
    ///
    /// The subscriber sees only events pushed after this point; fragments
    /// appended earlier are not replayed. The post-call transcript endpoint
    /// is the recovery path for late viewers.
    pub fn subscribe(&self, call_sid: &str, sender: mpsc::Sender<StreamEvent>) -> SubscriberId {
        let id = SubscriberId(Uuid::new_v4());
        let mut state = self.write();
        state
            .subscribers
            .entry(call_sid.to_string())
            .or_default()
            .push(Subscriber { id, sender });
        tracing::debug!(call_sid, subscriber = %id, "stream subscriber registered");
        id
    }

    /// Removes a delivery sink. Removing the last sink drops the subscriber
    /// set entry (but not the session or its transcript).
    pub fn unsubscribe(&self, call_sid: &str, id: SubscriberId) {
        let mut state = self.write();
        if let Some(sinks) = state.subscribers.get_mut(call_sid) {
            sinks.retain(|s| s.id != id);
            if sinks.is_empty() {
                state.subscribers.remove(call_sid);
            }
        }
        tracing::debug!(call_sid, subscriber = %id, "stream subscriber removed");
    }

    /// Number of currently attached subscribers for the call.
    pub fn subscriber_count(&self, call_sid: &str) -> usize {
        self.read()
            .subscribers
            .get(call_sid)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Marks the session ended and pushes a `call_ended` event to all
    /// subscribers. The session and its transcript survive until eviction.
    pub fn broadcast_call_ended(&self, call_sid: &str) {
        let event = StreamEvent::CallEnded {
            session_id: call_sid.to_string(),
        };
        let mut state = self.write();
        if let Some(session) = state.sessions.get_mut(call_sid) {
            session.lifecycle = CallLifecycle::Ended;
        }
        Self::fan_out(&mut state, call_sid, &event);
    }

    /// Schedules removal of the session, its subscriber set, and both
    /// mapping directions after `delay`.
    ///
    /// The timer captures the session's current generation; if the call SID
    /// has been reused by a newer session when the timer fires, the
    /// eviction is abandoned. Attached subscribers have their channels
    /// dropped by eviction, which closes their streams — the signal for the
    /// client to disconnect.
    pub fn schedule_eviction(&self, call_sid: &str, delay: Duration) {
        let expected = self.read().sessions.get(call_sid).map(|s| s.generation());
        let registry = self.clone();
        let call_sid = call_sid.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            registry.evict(&call_sid, expected);
        });
    }

    fn evict(&self, call_sid: &str, expected_generation: Option<u64>) {
        let mut state = self.write();
        let current = state.sessions.get(call_sid).map(|s| s.generation());
        if current != expected_generation {
            tracing::debug!(call_sid, "skipping stale eviction; session was recreated");
            return;
        }
        state.sessions.remove(call_sid);
        state.subscribers.remove(call_sid);
        if let Some(conversation_id) = state.call_to_conversation.remove(call_sid) {
            state.conversation_to_call.remove(&conversation_id);
        }
        tracing::info!(call_sid, "evicted call session");
    }

    /// Pushes an event to every subscriber for the call. Delivery uses
    /// non-blocking sends; a subscriber whose channel is closed or full is
    /// dropped from the set so it cannot affect delivery to others.
    fn fan_out(state: &mut RegistryState, call_sid: &str, event: &StreamEvent) {
        let Some(sinks) = state.subscribers.get_mut(call_sid) else {
            return;
        };
        sinks.retain(|subscriber| match subscriber.sender.try_send(event.clone()) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(
                    call_sid,
                    subscriber = %subscriber.id,
                    error = %e,
                    "dropping unreachable stream subscriber"
                );
                false
            }
        });
        if sinks.is_empty() {
            state.subscribers.remove(call_sid);
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
