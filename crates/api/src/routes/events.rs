//! Review change notifications.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use doc_store::DocumentStore;
use reputation::{IgnoreReason, ReviewChange};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct EventAccepted {
    pub outcome: &'static str,
}

/// POST /events/review-changed
///
/// Always accepted: a change that cannot be parsed or applied is logged and
/// dropped, and the outcome is reported for visibility only.
#[tracing::instrument(skip(state, payload))]
pub async fn review_changed<S: DocumentStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    payload: Result<Json<ReviewChange>, JsonRejection>,
) -> (StatusCode, Json<EventAccepted>) {
    let outcome = match payload {
        Ok(Json(change)) => state.ingress.handle(&change).await,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "dropping unreadable review change");
            state
                .ingress
                .ignore(IgnoreReason::Invalid(rejection.body_text()))
        }
    };

    (
        StatusCode::ACCEPTED,
        Json(EventAccepted {
            outcome: outcome.label(),
        }),
    )
}
