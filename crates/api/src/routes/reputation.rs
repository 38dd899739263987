//! Administrative recompute and per-subject statistics endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::HeaderMap;
use common::SubjectId;
use doc_store::DocumentStore;
use reputation::{BatchSummary, SubjectStatistics};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::state::AppState;

// -- Request types --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsRequest {
    #[serde(default)]
    pub subject_id: Option<String>,
}

// -- Response types --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecomputeAllResponse {
    pub success: bool,
    pub processed: usize,
    pub errors: usize,
    pub total: usize,
    pub message: String,
}

impl From<BatchSummary> for RecomputeAllResponse {
    fn from(summary: BatchSummary) -> Self {
        let mut message = format!(
            "Recompute finished: {} subjects processed, {} errors",
            summary.processed, summary.errors
        );
        if summary.cancelled {
            message.push_str(&format!(", cancelled with {} skipped", summary.skipped));
        }

        Self {
            success: true,
            processed: summary.processed,
            errors: summary.errors,
            total: summary.total,
            message,
        }
    }
}

// -- Handlers --

/// POST /reputation/recompute-all
#[tracing::instrument(skip(state, headers))]
pub async fn recompute_all<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
) -> Result<Json<RecomputeAllResponse>, ApiError> {
    state.admin_tokens.authorize(&headers)?;

    let summary = state
        .batch
        .recompute_all(state.shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Full recompute failed: {e}")))?;

    Ok(Json(summary.into()))
}

/// POST /reputation/statistics
#[tracing::instrument(skip(state, payload))]
pub async fn statistics<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    payload: Result<Json<StatisticsRequest>, JsonRejection>,
) -> Result<Json<SubjectStatistics>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::InvalidArgument(e.body_text()))?;

    let subject_id = request
        .subject_id
        .filter(|id| !id.trim().is_empty())
        .map(SubjectId::new)
        .ok_or_else(|| ApiError::InvalidArgument("subjectId is required".to_string()))?;

    let stats = state.stats.get(&subject_id).await?;
    Ok(Json(stats))
}
