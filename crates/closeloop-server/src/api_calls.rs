//! Call initiation and post-call transcript retrieval handlers.

use crate::AppState;
use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use closeloop_telephony::{validate_phone_number, CallbackUrls, TelephonyError};
use closeloop_types::NewCallLog;
use closeloop_voice::VoiceAgentError;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

/// Request body for `POST /api/calls/initiate`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateCallRequest {
    /// Destination number in E.164 form.
    pub phone_number: String,
    /// Campaign this call belongs to, if any.
    pub campaign_id: Option<String>,
    /// Lead being called, if any.
    pub lead_id: Option<String>,
}

/// Handler for `POST /api/calls/initiate`.
///
/// Validates the destination, derives the webhook callback URLs from the
/// public origin, and asks the telephony provider to place the call. On
/// success the session is pre-created in the registry and a call-log row is
/// written (best effort: a logging failure never fails a placed call).
pub async fn initiate_call_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<InitiateCallRequest>,
) -> Result<Json<serde_json::Value>, Response> {
    if let Err(e) = validate_phone_number(&request.phone_number) {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response());
    }

    let callbacks = CallbackUrls::from_origin(&state.public_origin).map_err(|e| {
        let status = match e {
            TelephonyError::LocalOrigin(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::warn!(error = %e, "cannot derive webhook callback urls");
        (status, Json(json!({ "error": e.to_string() }))).into_response()
    })?;

    let placed = state
        .twilio
        .place_call(&request.phone_number, &callbacks)
        .await
        .map_err(|e| match e {
            TelephonyError::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response(),
            TelephonyError::Provider {
                status,
                code,
                ref message,
            } => (
                StatusCode::BAD_GATEWAY,
                Json(json!({
                    "error": message,
                    "providerStatus": status,
                    "providerCode": code,
                })),
            )
                .into_response(),
            other => (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": other.to_string() })),
            )
                .into_response(),
        })?;

    // The session exists before the first webhook can arrive.
    state.registry.ensure_session(&placed.sid);

    let pool = state.pool.clone();
    let log = NewCallLog {
        call_sid: placed.sid.clone(),
        campaign_id: request.campaign_id,
        lead_id: request.lead_id,
        phone_number: request.phone_number,
        status: placed.status.clone(),
    };
    let call_sid = placed.sid.clone();
    let logged = tokio::task::spawn_blocking(move || {
        let conn = pool.get().map_err(|e| e.to_string())?;
        closeloop_db::insert_call_log(&conn, &log).map_err(|e| e.to_string())
    })
    .await;
    match logged {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!(call_sid, error = %e, "failed to write call log"),
        Err(e) => tracing::warn!(call_sid, error = %e, "call log task join error"),
    }

    Ok(Json(json!({
        "success": true,
        "callSid": placed.sid,
        "status": placed.status,
    })))
}

/// Handler for `GET /api/calls/{callSid}/transcript`.
///
/// Fetches the voice platform's own conversation record for the call.
/// Before the event webhook has linked the call to a conversation there is
/// nothing to fetch, so the response reports `pending` with an empty
/// transcript rather than an error.
pub async fn get_transcript_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(call_sid): Path<String>,
) -> Result<Json<serde_json::Value>, Response> {
    let conversation_id = state.registry.resolve(&call_sid);
    if conversation_id == call_sid {
        return Ok(Json(json!({
            "callSid": call_sid,
            "status": "pending",
            "transcript": [],
        })));
    }

    let record = state
        .voice_agent
        .conversation(&conversation_id)
        .await
        .map_err(|e| {
            let status = match e {
                VoiceAgentError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_GATEWAY,
            };
            tracing::warn!(call_sid, error = %e, "transcript fetch failed");
            (status, Json(json!({ "error": e.to_string() }))).into_response()
        })?;

    let status = record.status.clone();
    Ok(Json(json!({
        "callSid": call_sid,
        "conversationId": conversation_id,
        "status": status,
        "transcript": record.into_fragments(),
    })))
}
