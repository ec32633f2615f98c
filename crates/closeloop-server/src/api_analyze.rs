//! Live analysis endpoint.

use crate::AppState;
use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use closeloop_analysis::{AnalysisError, AnalysisRequest};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Per-call analysis serialization.
///
/// Overlapping analysis requests for one call risk an earlier verdict
/// overwriting a later one on the dashboard, so requests carrying a call
/// SID are serialized behind a per-call async mutex. The outer map lock is
/// synchronous and held only for map operations, never across the model
/// round trip.
///
/// Entries are removed once the last holder releases, so the map tracks
/// only calls with an analysis in flight rather than every SID ever seen.
#[derive(Clone, Default)]
pub struct AnalysisLocks {
    inner: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
}

impl AnalysisLocks {
    fn for_call(&self, call_sid: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut map = self.map();
        map.entry(call_sid.to_string()).or_default().clone()
    }

    /// Drops the entry for `call_sid` when no other request still holds a
    /// handle to it. The caller must have dropped its own clone first; a
    /// strong count of one then means the map holds the sole reference.
    fn release(&self, call_sid: &str) {
        let mut map = self.map();
        if map
            .get(call_sid)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            map.remove(call_sid);
        }
    }

    #[cfg(test)]
    fn tracked_calls(&self) -> usize {
        self.map().len()
    }

    fn map(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<tokio::sync::Mutex<()>>>> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Request body for `POST /api/analyze/transcript`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    /// When present, serializes this request against other analysis
    /// requests for the same call.
    #[serde(default)]
    pub call_sid: Option<String>,
    #[serde(flatten)]
    pub request: AnalysisRequest,
}

/// Handler for `POST /api/analyze/transcript`.
///
/// Runs one bounded language-model round trip over the new fragment plus
/// the submitted history window and returns the verdict. A reply the model
/// garbles degrades to the neutral verdict inside the engine; only
/// configuration and upstream failures surface as errors here.
pub async fn analyze_transcript_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(body): Json<AnalyzeRequest>,
) -> Result<Json<serde_json::Value>, Response> {
    if body.request.transcript.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "transcript must not be empty" })),
        )
            .into_response());
    }

    let result = match body.call_sid.as_deref() {
        Some(sid) => {
            let lock = state.analysis_locks.for_call(sid);
            let result = {
                let _guard = lock.lock().await;
                state.analysis.analyze(&body.request).await
            };
            drop(lock);
            state.analysis_locks.release(sid);
            result
        }
        None => state.analysis.analyze(&body.request).await,
    };

    let verdict = result.map_err(|e| {
        let status = match e {
            AnalysisError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_GATEWAY,
        };
        tracing::warn!(error = %e, "analysis request failed");
        (status, Json(json!({ "error": e.to_string() }))).into_response()
    })?;

    Ok(Json(json!({
        "success": true,
        "analysis": verdict,
    })))
}

#[cfg(test)]
mod tests {
    use super::AnalysisLocks;
    use std::sync::Arc;

    #[tokio::test]
    async fn lock_map_does_not_accumulate_finished_calls() {
        let locks = AnalysisLocks::default();

        for i in 0..1_000 {
            let sid = format!("CA{i:04}");
            let lock = locks.for_call(&sid);
            drop(lock.lock().await);
            drop(lock);
            locks.release(&sid);
        }

        assert_eq!(locks.tracked_calls(), 0);
    }

    #[tokio::test]
    async fn release_keeps_entries_other_requests_still_hold() {
        let locks = AnalysisLocks::default();

        let held = locks.for_call("CA100");
        let _guard = held.lock().await;

        // A second request for the same call finishes and releases while
        // the first still holds its handle.
        let other = locks.for_call("CA100");
        drop(other);
        locks.release("CA100");
        assert_eq!(locks.tracked_calls(), 1);

        // Both handles point at the same mutex, so serialization held.
        let again = locks.for_call("CA100");
        assert!(Arc::ptr_eq(&held, &again));

        drop(again);
        drop(_guard);
        drop(held);
        locks.release("CA100");
        assert_eq!(locks.tracked_calls(), 0);
    }
}
