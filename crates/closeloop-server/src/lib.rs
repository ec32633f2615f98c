//! Closeloop server library logic.

pub mod api_analyze;
pub mod api_calls;
pub mod api_crm;
pub mod api_stream;
pub mod api_twilio;
pub mod api_voice_events;
pub mod config;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Extension, Json, Router,
};
use closeloop_analysis::AnalysisEngine;
use closeloop_db::DbPool;
use closeloop_registry::SessionRegistry;
use closeloop_telephony::TwilioClient;
use closeloop_voice::VoiceAgentClient;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: DbPool,
    /// In-memory call-session registry (mappings, transcripts, subscribers).
    pub registry: SessionRegistry,
    /// Twilio REST client for outbound call placement.
    pub twilio: TwilioClient,
    /// Voice-agent platform client.
    pub voice_agent: VoiceAgentClient,
    /// Live analysis engine.
    pub analysis: AnalysisEngine,
    /// Public origin of this deployment, used to derive webhook callback URLs.
    pub public_origin: String,
    /// Per-call analysis serialization locks.
    pub analysis_locks: api_analyze::AnalysisLocks,
}

/// Maximum request body size (1 MiB). Webhook and API payloads are small;
/// this protects against OOM from oversized payloads.
const MAX_REQUEST_BODY_BYTES: usize = 1024 * 1024;

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/calls/initiate", post(api_calls::initiate_call_handler))
        .route(
            "/api/calls/{callSid}/stream",
            get(api_stream::get_call_stream_handler),
        )
        .route(
            "/api/calls/{callSid}/transcript",
            get(api_calls::get_transcript_handler),
        )
        .route(
            "/api/analyze/transcript",
            post(api_analyze::analyze_transcript_handler),
        )
        .route("/webhooks/twilio/voice", post(api_twilio::voice_handler))
        .route("/webhooks/twilio/status", post(api_twilio::status_handler))
        .route(
            "/webhooks/twilio/recording",
            post(api_twilio::recording_handler),
        )
        .route(
            "/webhooks/voice-agent/events",
            post(api_voice_events::events_handler),
        )
        .route(
            "/api/campaigns",
            post(api_crm::create_campaign_handler).get(api_crm::list_campaigns_handler),
        )
        .route(
            "/api/campaigns/{campaignId}",
            get(api_crm::get_campaign_handler),
        )
        .route(
            "/api/campaigns/{campaignId}/analyze-leads",
            post(api_crm::analyze_leads_handler),
        )
        .route(
            "/api/leads",
            post(api_crm::create_lead_handler).get(api_crm::list_leads_handler),
        )
        .route("/api/call-logs", get(api_crm::list_call_logs_handler))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}
