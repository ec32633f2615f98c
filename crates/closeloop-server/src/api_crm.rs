//! Campaign, lead, and call-log record handlers.

use crate::AppState;
use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use closeloop_db::{DbPool, StoreError};
use closeloop_types::{Campaign, CallLog, Lead, NewCampaign, NewLead};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

/// Runs a store operation on a pooled connection off the async runtime.
async fn with_conn<T, F>(pool: DbPool, op: F) -> Result<T, Response>
where
    T: Send + 'static,
    F: FnOnce(&rusqlite::Connection) -> Result<T, StoreError> + Send + 'static,
{
    let result = tokio::task::spawn_blocking(move || {
        let conn = pool.get()?;
        op(&conn)
    })
    .await
    .map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": format!("task join error: {}", e) })),
        )
            .into_response()
    })?;

    result.map_err(|e| match e {
        StoreError::NotFound(id) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("not found: {id}") })),
        )
            .into_response(),
        other => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": other.to_string() })),
        )
            .into_response(),
    })
}

/// Handler for `POST /api/campaigns`.
pub async fn create_campaign_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(params): Json<NewCampaign>,
) -> Result<(StatusCode, Json<Campaign>), Response> {
    let campaign = with_conn(state.pool.clone(), move |conn| {
        closeloop_db::create_campaign(conn, &params)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(campaign)))
}

/// Handler for `GET /api/campaigns`.
pub async fn list_campaigns_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Vec<Campaign>>, Response> {
    let campaigns = with_conn(state.pool.clone(), closeloop_db::list_campaigns).await?;
    Ok(Json(campaigns))
}

/// Handler for `GET /api/campaigns/{campaignId}`.
pub async fn get_campaign_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(campaign_id): Path<String>,
) -> Result<Json<Campaign>, Response> {
    let campaign = with_conn(state.pool.clone(), move |conn| {
        closeloop_db::get_campaign(conn, &campaign_id)
    })
    .await?;
    Ok(Json(campaign))
}

/// Handler for `POST /api/leads`.
pub async fn create_lead_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(params): Json<NewLead>,
) -> Result<(StatusCode, Json<Lead>), Response> {
    let lead = with_conn(state.pool.clone(), move |conn| {
        closeloop_db::create_lead(conn, &params)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(lead)))
}

/// Query parameters for `GET /api/leads`.
#[derive(Debug, Deserialize)]
pub struct LeadsQuery {
    /// Restrict the listing to one campaign.
    pub campaign_id: Option<String>,
}

/// Handler for `GET /api/leads`.
pub async fn list_leads_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<LeadsQuery>,
) -> Result<Json<Vec<Lead>>, Response> {
    let leads = with_conn(state.pool.clone(), move |conn| {
        closeloop_db::list_leads(conn, query.campaign_id.as_deref())
    })
    .await?;
    Ok(Json(leads))
}

/// Handler for `POST /api/campaigns/{campaignId}/analyze-leads`.
///
/// Scores every lead of the campaign against the campaign profile, one
/// model round trip per lead, and persists score and reason on each lead
/// row. A reply the model garbles, or a failed round trip for one lead,
/// degrades that lead to the neutral score instead of failing the pass.
pub async fn analyze_leads_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(campaign_id): Path<String>,
) -> Result<Json<serde_json::Value>, Response> {
    let campaign = {
        let campaign_id = campaign_id.clone();
        with_conn(state.pool.clone(), move |conn| {
            closeloop_db::get_campaign(conn, &campaign_id)
        })
        .await?
    };

    let leads = {
        let campaign_id = campaign_id.clone();
        with_conn(state.pool.clone(), move |conn| {
            closeloop_db::list_leads(conn, Some(&campaign_id))
        })
        .await?
    };

    if leads.is_empty() {
        return Ok(Json(json!({
            "success": true,
            "analyzed_leads": [],
            "message": "No leads found for this campaign",
        })));
    }

    if !state.analysis.is_configured() {
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "analysis engine is not configured" })),
        )
            .into_response());
    }

    let mut analyzed = Vec::with_capacity(leads.len());
    for mut lead in leads {
        let scored = match state.analysis.score_lead(&campaign, &lead).await {
            Ok(scored) => scored,
            Err(e) => {
                tracing::warn!(lead_id = %lead.id, error = %e, "lead scoring failed");
                closeloop_analysis::LeadScore {
                    score: 50,
                    reason: "Error analyzing lead profile".to_string(),
                }
            }
        };

        // A lost write degrades to a stale row, not a failed pass.
        let persist = {
            let lead_id = lead.id.clone();
            let score = scored.score;
            let reason = scored.reason.clone();
            with_conn(state.pool.clone(), move |conn| {
                closeloop_db::update_lead_score(conn, &lead_id, score, &reason)
            })
            .await
        };
        if persist.is_err() {
            tracing::warn!(lead_id = %lead.id, "failed to persist lead score");
        }

        lead.score = scored.score;
        lead.score_reason = Some(scored.reason);
        analyzed.push(lead);
    }

    Ok(Json(json!({
        "success": true,
        "analyzed_leads": analyzed,
        "count": analyzed.len(),
    })))
}

/// Handler for `GET /api/call-logs`.
pub async fn list_call_logs_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Vec<CallLog>>, Response> {
    let logs = with_conn(state.pool.clone(), closeloop_db::list_call_logs).await?;
    Ok(Json(logs))
}
