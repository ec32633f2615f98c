//! Transcript ingest webhook: the voice platform's event feed.
//!
//! Each event carries a call SID, a conversation id, or both. The handler
//! registers the mapping as a side effect whenever both are present, then
//! dispatches on the event type. Unknown types are acknowledged and ignored
//! so new platform event vocabulary cannot break delivery.

use crate::AppState;
use axum::{extract::Extension, Json};
use closeloop_types::{Speaker, TranscriptFragment};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// How long an ended session (transcript included) stays resident for
/// late-arriving reads before eviction.
const EVICTION_DELAY: Duration = Duration::from_secs(60);

/// The voice platform's event envelope (the fields this system reads).
#[derive(Debug, Deserialize)]
pub struct VoiceAgentEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub call_sid: Option<String>,
    #[serde(default)]
    pub conversation_id: Option<String>,
    /// Transcript text, preferred over `text` when both are present.
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    /// Speaker hint ("agent" or anything else) for the generic
    /// `transcript` event type.
    #[serde(default)]
    pub speaker: Option<String>,
}

impl VoiceAgentEvent {
    /// The canonical session id: the call SID verbatim when present,
    /// otherwise the conversation id resolved through the registry (which
    /// yields the call SID once the mapping exists).
    fn session_id(&self, state: &AppState) -> Option<String> {
        if let Some(call_sid) = &self.call_sid {
            return Some(call_sid.clone());
        }
        self.conversation_id
            .as_ref()
            .map(|id| state.registry.resolve(id))
    }

    fn text(&self) -> &str {
        self.transcript
            .as_deref()
            .or(self.text.as_deref())
            .unwrap_or_default()
    }
}

/// Handler for `POST /webhooks/voice-agent/events`.
///
/// Always acknowledges with `{"received": true}` once the body parses as
/// the event envelope; the platform must never see transient internal state
/// as a delivery failure.
pub async fn events_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(event): Json<VoiceAgentEvent>,
) -> Json<serde_json::Value> {
    if let (Some(call_sid), Some(conversation_id)) = (&event.call_sid, &event.conversation_id) {
        state.registry.register_mapping(call_sid, conversation_id);
    }

    let Some(session_id) = event.session_id(&state) else {
        tracing::warn!(event_type = %event.event_type, "event carries no session identifier");
        return Json(json!({ "received": true }));
    };

    match event.event_type.as_str() {
        "conversation.initiated" => {
            state.registry.ensure_session(&session_id);
            tracing::info!(session_id, "conversation initiated");
        }
        "agent.response" => {
            append(&state, &session_id, Speaker::Agent, event.text());
        }
        "user.transcript" => {
            append(&state, &session_id, Speaker::Prospect, event.text());
        }
        "transcript" => {
            let speaker = match event.speaker.as_deref() {
                Some("agent") => Speaker::Agent,
                _ => Speaker::Prospect,
            };
            append(&state, &session_id, speaker, event.text());
        }
        "conversation.ended" => {
            tracing::info!(session_id, "conversation ended");
            state.registry.broadcast_call_ended(&session_id);
            state.registry.schedule_eviction(&session_id, EVICTION_DELAY);
        }
        other => {
            tracing::debug!(session_id, event_type = other, "ignoring unrecognized event type");
        }
    }

    Json(json!({ "received": true }))
}

fn append(state: &AppState, session_id: &str, speaker: Speaker, text: &str) {
    if text.is_empty() {
        tracing::debug!(session_id, "dropping transcript event with empty text");
        return;
    }
    let fragment = TranscriptFragment::now(speaker, text);
    tracing::debug!(session_id, speaker = ?speaker, "transcript fragment ingested");
    state.registry.append_fragment(session_id, fragment);
}
