//! Reacts to review mutations by recomputing the affected subject.

use common::{ReviewId, SubjectId};
use doc_store::{DocumentStore, ReviewRecord, SubjectType};
use serde::{Deserialize, Serialize};

use crate::aggregator::Reputation;
use crate::pipeline::RecomputePipeline;
use crate::{ReputationError, Result};

/// The part of a review a change event needs to locate its subject.
///
/// Every field may be missing or null, and any other review field is ignored:
/// the recompute reads the stored reviews, not the snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSnapshot {
    #[serde(default)]
    pub id: Option<ReviewId>,
    #[serde(default)]
    pub subject_id: Option<SubjectId>,
    #[serde(default)]
    pub subject_type: Option<SubjectType>,
    #[serde(default)]
    pub score: Option<f64>,
}

impl ReviewSnapshot {
    pub fn is_user_review(&self) -> bool {
        self.subject_type.as_ref().is_some_and(SubjectType::is_user)
    }
}

impl From<ReviewRecord> for ReviewSnapshot {
    fn from(review: ReviewRecord) -> Self {
        Self {
            id: Some(review.id),
            subject_id: review.subject_id,
            subject_type: review.subject_type,
            score: review.score,
        }
    }
}

/// A review record mutation: `before` is absent on create, `after` on delete.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewChange {
    #[serde(default)]
    pub before: Option<ReviewSnapshot>,
    #[serde(default)]
    pub after: Option<ReviewSnapshot>,
}

impl ReviewChange {
    pub fn created(review: impl Into<ReviewSnapshot>) -> Self {
        Self {
            before: None,
            after: Some(review.into()),
        }
    }

    pub fn updated(before: impl Into<ReviewSnapshot>, after: impl Into<ReviewSnapshot>) -> Self {
        Self {
            before: Some(before.into()),
            after: Some(after.into()),
        }
    }

    pub fn deleted(review: impl Into<ReviewSnapshot>) -> Self {
        Self {
            before: Some(review.into()),
            after: None,
        }
    }

    /// The snapshot that identifies the subject: `after`, else `before`.
    pub fn snapshot(&self) -> Option<&ReviewSnapshot> {
        self.after.as_ref().or(self.before.as_ref())
    }
}

/// Why a change event was dropped without recomputing anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Neither snapshot was present.
    NoSnapshot,
    /// The chosen snapshot lacked a required field.
    Invalid(String),
    /// The review targets something other than a user.
    NonUserSubject(String),
}

/// What handling a change event did.
#[derive(Debug, Clone, PartialEq)]
pub enum IngressOutcome {
    Recomputed {
        subject_id: SubjectId,
        reputation: Reputation,
    },
    Ignored(IgnoreReason),
    Failed {
        subject_id: SubjectId,
        error: String,
    },
}

impl IngressOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            IngressOutcome::Recomputed { .. } => "recomputed",
            IngressOutcome::Ignored(_) => "ignored",
            IngressOutcome::Failed { .. } => "failed",
        }
    }
}

/// Extracts the subject a snapshot affects, checking the fields a counted
/// review needs.
fn validate(snapshot: &ReviewSnapshot) -> Result<(&SubjectId, &SubjectType)> {
    let subject_id = snapshot
        .subject_id
        .as_ref()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ReputationError::Validation("missing subjectId".to_string()))?;
    let subject_type = snapshot
        .subject_type
        .as_ref()
        .ok_or_else(|| ReputationError::Validation("missing subjectType".to_string()))?;
    if snapshot.score.is_none() {
        return Err(ReputationError::Validation("missing score".to_string()));
    }
    Ok((subject_id, subject_type))
}

/// Passive handler for review change events.
///
/// No caller waits on the result: every failure is logged and reported in
/// the outcome, never returned as an error. The next mutation on the same
/// subject, or a full recompute, repairs whatever a failed run left behind.
#[derive(Clone)]
pub struct EventIngress<S: DocumentStore> {
    pipeline: RecomputePipeline<S>,
}

impl<S: DocumentStore> EventIngress<S> {
    pub fn new(pipeline: RecomputePipeline<S>) -> Self {
        Self { pipeline }
    }

    #[tracing::instrument(skip(self, change))]
    pub async fn handle(&self, change: &ReviewChange) -> IngressOutcome {
        let Some(snapshot) = change.snapshot() else {
            return self.ignore(IgnoreReason::NoSnapshot);
        };

        let (subject_id, subject_type) = match validate(snapshot) {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(review_id = ?snapshot.id, error = %e, "dropping review change");
                return self.ignore(IgnoreReason::Invalid(e.to_string()));
            }
        };

        if !subject_type.is_user() {
            tracing::debug!(review_id = ?snapshot.id, subject_type = %subject_type, "not a user review");
            return self.ignore(IgnoreReason::NonUserSubject(subject_type.to_string()));
        }

        match self.pipeline.run(subject_id).await {
            Ok(recomputed) => {
                tracing::info!(
                    subject_id = %subject_id,
                    mean = recomputed.reputation.mean,
                    count = recomputed.reputation.count,
                    copies = recomputed.report.copies_updated,
                    "reputation updated"
                );
                IngressOutcome::Recomputed {
                    subject_id: subject_id.clone(),
                    reputation: recomputed.reputation,
                }
            }
            Err(e) => {
                tracing::error!(subject_id = %subject_id, error = %e, "reputation recompute failed");
                IngressOutcome::Failed {
                    subject_id: subject_id.clone(),
                    error: e.to_string(),
                }
            }
        }
    }

    /// Records a dropped event.
    pub fn ignore(&self, reason: IgnoreReason) -> IngressOutcome {
        metrics::counter!("reputation_change_events_ignored_total").increment(1);
        IngressOutcome::Ignored(reason)
    }
}

#[cfg(test)]
mod tests {
    use doc_store::{DocumentStoreExt, InMemoryDocumentStore, OwnedRecord, SubjectRecord};

    use super::*;
    use crate::config::ReputationConfig;

    async fn setup() -> (InMemoryDocumentStore, EventIngress<InMemoryDocumentStore>) {
        let store = InMemoryDocumentStore::new();
        store.put_subject(SubjectRecord::new("u1")).await.unwrap();
        let pipeline = RecomputePipeline::new(store.clone(), &ReputationConfig::default());
        (store, EventIngress::new(pipeline))
    }

    #[tokio::test]
    async fn created_review_recomputes_subject() {
        let (store, ingress) = setup().await;
        store
            .put_owned_record(OwnedRecord::new("item-1", "u1"))
            .await
            .unwrap();
        let review = ReviewRecord::user_review("u1", 5.0);
        store.put_review(review.clone()).await.unwrap();

        let outcome = ingress.handle(&ReviewChange::created(review)).await;
        assert_eq!(
            outcome,
            IngressOutcome::Recomputed {
                subject_id: "u1".into(),
                reputation: Reputation { mean: 5.0, count: 1 },
            }
        );

        let copies = store.owned_records(&"u1".into()).await.unwrap();
        assert_eq!(copies[0].owner_mean_score, Some(5.0));
    }

    #[tokio::test]
    async fn deletion_uses_before_snapshot() {
        let (store, ingress) = setup().await;
        let kept = ReviewRecord::user_review("u1", 2.0);
        let removed = ReviewRecord::user_review("u1", 4.0);
        store.put_review(kept).await.unwrap();
        store.put_review(removed.clone()).await.unwrap();
        store.remove_review(&removed.id).await;

        let outcome = ingress.handle(&ReviewChange::deleted(removed)).await;
        assert!(matches!(
            outcome,
            IngressOutcome::Recomputed { reputation, .. } if reputation == (Reputation { mean: 2.0, count: 1 })
        ));
    }

    #[tokio::test]
    async fn soft_delete_update_excludes_review() {
        let (store, ingress) = setup().await;
        let before = ReviewRecord::user_review("u1", 1.0).with_id("r1");
        let after = before.clone().deleted_at(chrono::Utc::now());
        store.put_review(after.clone()).await.unwrap();

        let outcome = ingress.handle(&ReviewChange::updated(before, after)).await;
        assert!(matches!(
            outcome,
            IngressOutcome::Recomputed { reputation, .. } if reputation == Reputation::empty()
        ));
        let subject = store.get_subject(&"u1".into()).await.unwrap().unwrap();
        assert_eq!(subject.review_count, 0);
    }

    #[tokio::test]
    async fn empty_change_is_ignored() {
        let (_, ingress) = setup().await;
        let outcome = ingress.handle(&ReviewChange::default()).await;
        assert_eq!(outcome, IngressOutcome::Ignored(IgnoreReason::NoSnapshot));
        assert_eq!(outcome.label(), "ignored");
    }

    #[tokio::test]
    async fn snapshot_missing_score_is_dropped() {
        let (store, ingress) = setup().await;
        let mut review = ReviewRecord::user_review("u1", 3.0);
        review.score = None;

        let outcome = ingress.handle(&ReviewChange::created(review)).await;
        assert_eq!(
            outcome,
            IngressOutcome::Ignored(IgnoreReason::Invalid(
                "Invalid review change: missing score".to_string()
            ))
        );
        let subject = store.get_subject(&"u1".into()).await.unwrap().unwrap();
        assert!(subject.updated_at.is_none());
    }

    #[tokio::test]
    async fn snapshot_missing_subject_is_dropped() {
        let (_, ingress) = setup().await;
        let mut review = ReviewRecord::user_review("u1", 3.0);
        review.subject_id = None;

        let outcome = ingress.handle(&ReviewChange::created(review)).await;
        assert!(matches!(outcome, IngressOutcome::Ignored(IgnoreReason::Invalid(_))));
    }

    #[tokio::test]
    async fn non_user_review_is_dropped() {
        let (_, ingress) = setup().await;
        let review = ReviewRecord::user_review("u1", 3.0).with_subject_type("item");

        let outcome = ingress.handle(&ReviewChange::created(review)).await;
        assert_eq!(
            outcome,
            IngressOutcome::Ignored(IgnoreReason::NonUserSubject("item".to_string()))
        );
    }

    #[tokio::test]
    async fn missing_subject_record_is_reported_not_raised() {
        let (store, ingress) = setup().await;
        let review = ReviewRecord::user_review("ghost", 4.0);
        store.put_review(review.clone()).await.unwrap();

        let outcome = ingress.handle(&ReviewChange::created(review)).await;
        assert!(matches!(
            outcome,
            IngressOutcome::Failed { ref subject_id, .. } if subject_id.as_str() == "ghost"
        ));
        assert_eq!(outcome.label(), "failed");
    }

    #[tokio::test]
    async fn store_failure_is_swallowed() {
        let (store, ingress) = setup().await;
        store.set_fail_reads(true).await;

        let outcome = ingress
            .handle(&ReviewChange::created(ReviewRecord::user_review("u1", 4.0)))
            .await;
        assert!(matches!(outcome, IngressOutcome::Failed { .. }));
    }

    #[test]
    fn deserializes_legacy_wire_snapshot() {
        let change: ReviewChange = serde_json::from_value(serde_json::json!({
            "after": {
                "id": "r1",
                "subjectId": "u1",
                "subjectType": "usuario",
                "score": 4,
                "visible": true,
                "deletedAt": null,
                "createdAt": "2024-05-01T12:00:00Z"
            }
        }))
        .unwrap();

        let snapshot = change.snapshot().unwrap();
        assert!(change.before.is_none());
        assert!(snapshot.is_user_review());
        assert_eq!(snapshot.score, Some(4.0));
    }

    #[tokio::test]
    async fn snapshot_without_created_at_recomputes() {
        let (store, ingress) = setup().await;
        store
            .put_review(ReviewRecord::user_review("u1", 4.0))
            .await
            .unwrap();

        let change: ReviewChange = serde_json::from_value(serde_json::json!({
            "after": {
                "id": "r1",
                "subjectId": "u1",
                "subjectType": "user",
                "score": 4,
                "visible": true
            }
        }))
        .unwrap();

        let outcome = ingress.handle(&change).await;
        assert_eq!(
            outcome,
            IngressOutcome::Recomputed {
                subject_id: "u1".into(),
                reputation: Reputation { mean: 4.0, count: 1 },
            }
        );
    }

    #[tokio::test]
    async fn snapshot_with_null_fields_recomputes() {
        let (store, ingress) = setup().await;
        store
            .put_review(ReviewRecord::user_review("u1", 2.0))
            .await
            .unwrap();

        let change: ReviewChange = serde_json::from_value(serde_json::json!({
            "before": null,
            "after": {
                "id": null,
                "subjectId": "u1",
                "subjectType": "usuario",
                "score": 2.5,
                "visible": null,
                "deletedAt": null,
                "createdAt": "2024-05-01T12:00:00Z"
            }
        }))
        .unwrap();

        let outcome = ingress.handle(&change).await;
        assert!(matches!(
            outcome,
            IngressOutcome::Recomputed { reputation, .. } if reputation == (Reputation { mean: 2.0, count: 1 })
        ));
    }

    #[test]
    fn record_converts_to_snapshot() {
        let review = ReviewRecord::user_review("u1", 3.0).with_id("r9");
        let snapshot = ReviewSnapshot::from(review);
        assert_eq!(snapshot.id, Some("r9".into()));
        assert_eq!(snapshot.subject_id, Some("u1".into()));
        assert_eq!(snapshot.score, Some(3.0));
        assert!(snapshot.is_user_review());
    }
}
