//! Transcript fragments and the live-stream event vocabulary.

use serde::{Deserialize, Serialize};

/// Who produced an utterance on the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    /// The AI voice agent.
    Agent,
    /// The human on the far end of the call.
    Prospect,
}

/// One attributed, timestamped utterance of transcribed speech.
///
/// Immutable once created: fragments are appended by the transcript ingest
/// webhook and only ever read after that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptFragment {
    /// Fragment id, unique within a session (timestamp-derived).
    pub id: String,
    /// Speaker attribution.
    pub speaker: Speaker,
    /// Transcribed text.
    pub text: String,
    /// Creation timestamp (RFC 3339).
    pub timestamp: String,
    /// Offset into the call in seconds, when the fragment was sourced from
    /// the voice platform's own conversation record.
    #[serde(rename = "timeInCall", skip_serializing_if = "Option::is_none")]
    pub time_in_call_secs: Option<f64>,
}

impl TranscriptFragment {
    /// Builds a fragment stamped with the current time. The id is derived
    /// from the timestamp so ids within a session are monotonically
    /// increasing with arrival order.
    pub fn now(speaker: Speaker, text: impl Into<String>) -> Self {
        let at = chrono::Utc::now();
        Self {
            id: format!("msg-{}", at.timestamp_millis()),
            speaker,
            text: text.into(),
            timestamp: at.to_rfc3339(),
            time_in_call_secs: None,
        }
    }
}

/// Lifecycle state of a call session held by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallLifecycle {
    /// Call is live (or not yet known to have ended).
    Active,
    /// The voice platform reported `conversation.ended`; eviction pending.
    Ended,
}

/// One message on the transcript SSE stream.
///
/// Serialized with a `type` discriminator and camelCase payload fields to
/// match what the dashboard consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StreamEvent {
    /// Acknowledgement sent immediately after a subscriber connects.
    #[serde(rename = "connected")]
    Connected {
        #[serde(rename = "callSid")]
        call_sid: String,
    },
    /// A new transcript fragment for the session.
    #[serde(rename = "transcript")]
    Transcript {
        #[serde(rename = "sessionId")]
        session_id: String,
        data: TranscriptFragment,
    },
    /// The voice platform reported the conversation has ended.
    #[serde(rename = "call_ended")]
    CallEnded {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
}
