//! Twilio webhook handlers: the voice answer webhook that bridges the call
//! to the voice agent, plus status and recording callbacks.
//!
//! The voice webhook sits on Twilio's answer path: whatever happens, it must
//! return HTTP 200 with a TwiML document. Failures degrade to a spoken
//! apology followed by hangup instead of an error status, so the prospect
//! hears a graceful message rather than dead air.

use crate::AppState;
use axum::{
    extract::{Extension, Form},
    http::header,
    response::IntoResponse,
    Json,
};
use closeloop_telephony::VoiceResponse;
use closeloop_voice::{BridgeMode, CallContext, VoiceAgentError};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

/// Spoken when the voice agent is not configured at all.
const CONFIG_APOLOGY: &str =
    "We are sorry, the AI agent is not configured. Please contact support.";

/// Spoken when bridging fails at call time.
const BRIDGE_APOLOGY: &str =
    "We are experiencing technical difficulties connecting to the AI agent. \
     Please try again later.";

/// Twilio's voice webhook form payload (the fields this system reads).
#[derive(Debug, Deserialize)]
pub struct VoiceWebhook {
    #[serde(rename = "CallSid")]
    pub call_sid: String,
    #[serde(rename = "From", default)]
    pub from: String,
    #[serde(rename = "To", default)]
    pub to: String,
    #[serde(rename = "Direction", default)]
    pub direction: String,
}

/// Handler for `POST /webhooks/twilio/voice`.
///
/// Invoked by Twilio when the outbound call is answered. Bridges the call
/// to the voice agent using the configured mode:
///
/// - `signed_url`: fetch a pre-signed media-session URL and answer with a
///   `<Connect><Stream>` document pointing at it.
/// - `register_call`: register the call with the platform and relay the
///   TwiML document the platform hands back, verbatim.
pub async fn voice_handler(
    Extension(state): Extension<Arc<AppState>>,
    Form(webhook): Form<VoiceWebhook>,
) -> impl IntoResponse {
    tracing::info!(
        call_sid = %webhook.call_sid,
        direction = %webhook.direction,
        "voice webhook received"
    );

    state.registry.ensure_session(&webhook.call_sid);

    let xml = match bridge_call(&state, &webhook).await {
        Ok(xml) => xml,
        Err(VoiceAgentError::Config(e)) => {
            tracing::error!(call_sid = %webhook.call_sid, error = %e, "voice agent not configured");
            VoiceResponse::apology(CONFIG_APOLOGY).to_xml()
        }
        Err(e) => {
            tracing::error!(call_sid = %webhook.call_sid, error = %e, "failed to bridge call");
            VoiceResponse::apology(BRIDGE_APOLOGY).to_xml()
        }
    };

    ([(header::CONTENT_TYPE, "text/xml")], xml)
}

async fn bridge_call(state: &AppState, webhook: &VoiceWebhook) -> Result<String, VoiceAgentError> {
    match state.voice_agent.config().bridge_mode {
        BridgeMode::SignedUrl => {
            let url = state.voice_agent.signed_connection_url().await?;
            Ok(VoiceResponse::new()
                .connect_stream(url, "inbound_track", "agent_stream")
                .to_xml())
        }
        BridgeMode::RegisterCall => {
            let context = CallContext {
                call_sid: webhook.call_sid.clone(),
                from: webhook.from.clone(),
                to: webhook.to.clone(),
                direction: webhook.direction.clone(),
            };
            let variables: HashMap<String, String> = HashMap::from([
                ("call_sid".to_string(), webhook.call_sid.clone()),
                ("phone_number".to_string(), webhook.to.clone()),
            ]);
            state.voice_agent.register_call(&context, &variables).await
        }
    }
}

/// Twilio's status callback form payload.
#[derive(Debug, Deserialize)]
pub struct StatusWebhook {
    #[serde(rename = "CallSid")]
    pub call_sid: String,
    #[serde(rename = "CallStatus", default)]
    pub call_status: String,
    #[serde(rename = "CallDuration", default)]
    pub call_duration: Option<String>,
    #[serde(rename = "ErrorCode", default)]
    pub error_code: Option<String>,
    #[serde(rename = "ErrorMessage", default)]
    pub error_message: Option<String>,
}

/// Handler for `POST /webhooks/twilio/status`.
///
/// Records call lifecycle transitions in the call log. Always acknowledges:
/// a database problem must not make Twilio retry or mark the callback
/// endpoint unhealthy.
pub async fn status_handler(
    Extension(state): Extension<Arc<AppState>>,
    Form(webhook): Form<StatusWebhook>,
) -> Json<serde_json::Value> {
    tracing::info!(
        call_sid = %webhook.call_sid,
        status = %webhook.call_status,
        "status webhook received"
    );

    let pool = state.pool.clone();
    let duration = webhook
        .call_duration
        .as_deref()
        .and_then(|d| d.parse::<u32>().ok());
    let result = tokio::task::spawn_blocking(move || {
        let conn = pool.get().map_err(|e| e.to_string())?;
        closeloop_db::update_call_status(
            &conn,
            &webhook.call_sid,
            &webhook.call_status,
            duration,
            webhook.error_code.as_deref(),
            webhook.error_message.as_deref(),
        )
        .map_err(|e| e.to_string())
    })
    .await;
    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!(error = %e, "failed to record call status"),
        Err(e) => tracing::warn!(error = %e, "call status task join error"),
    }

    Json(json!({ "received": true }))
}

/// Twilio's recording callback form payload.
#[derive(Debug, Deserialize)]
pub struct RecordingWebhook {
    #[serde(rename = "CallSid")]
    pub call_sid: String,
    #[serde(rename = "RecordingUrl", default)]
    pub recording_url: String,
    #[serde(rename = "RecordingDuration", default)]
    pub recording_duration: Option<String>,
}

/// Handler for `POST /webhooks/twilio/recording`.
///
/// Attaches the completed recording URL to the call log. Always acknowledges.
pub async fn recording_handler(
    Extension(state): Extension<Arc<AppState>>,
    Form(webhook): Form<RecordingWebhook>,
) -> Json<serde_json::Value> {
    tracing::info!(call_sid = %webhook.call_sid, "recording webhook received");

    let pool = state.pool.clone();
    let duration = webhook
        .recording_duration
        .as_deref()
        .and_then(|d| d.parse::<u32>().ok());
    let result = tokio::task::spawn_blocking(move || {
        let conn = pool.get().map_err(|e| e.to_string())?;
        closeloop_db::set_call_recording(
            &conn,
            &webhook.call_sid,
            &webhook.recording_url,
            duration,
        )
        .map_err(|e| e.to_string())
    })
    .await;
    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!(error = %e, "failed to record recording url"),
        Err(e) => tracing::warn!(error = %e, "recording task join error"),
    }

    Json(json!({ "received": true }))
}
