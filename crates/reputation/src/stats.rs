//! On-demand statistics for one subject, computed from live reviews.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use common::{ReviewId, SubjectId};
use doc_store::{DocumentStore, ReviewQuery, ReviewRecord};
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::aggregator::round2;
use crate::filter::ReviewFilter;

/// Number of reviews returned in [`SubjectStatistics::recent`].
pub const RECENT_LIMIT: usize = 5;

/// Review counts per rounded score, buckets 1 through 5.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreHistogram {
    buckets: [u64; 5],
}

impl ScoreHistogram {
    /// Counts `score` in the bucket nearest to it. Scores rounding outside
    /// 1..=5 are not counted.
    pub fn record(&mut self, score: f64) {
        let bucket = score.round();
        if (1.0..=5.0).contains(&bucket) {
            self.buckets[bucket as usize - 1] += 1;
        }
    }

    /// Count for bucket `star` (1..=5).
    pub fn get(&self, star: u8) -> u64 {
        match star {
            1..=5 => self.buckets[usize::from(star) - 1],
            _ => 0,
        }
    }

    pub fn total(&self) -> u64 {
        self.buckets.iter().sum()
    }
}

impl Serialize for ScoreHistogram {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let map: BTreeMap<String, u64> = (1..=5u8)
            .map(|star| (star.to_string(), self.get(star)))
            .collect();
        map.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ScoreHistogram {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let map = BTreeMap::<String, u64>::deserialize(deserializer)?;
        let mut histogram = ScoreHistogram::default();
        for (key, count) in map {
            let star: usize = key
                .parse()
                .map_err(|_| serde::de::Error::custom(format!("invalid bucket `{key}`")))?;
            if !(1..=5).contains(&star) {
                return Err(serde::de::Error::custom(format!("bucket out of range `{key}`")));
            }
            histogram.buckets[star - 1] = count;
        }
        Ok(histogram)
    }
}

/// A counted review as shown in statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSummary {
    pub id: ReviewId,
    pub score: f64,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl ReviewSummary {
    fn from_review(review: &ReviewRecord, score: f64) -> Self {
        Self {
            id: review.id.clone(),
            score,
            created_at: review.created_at,
            reviewer_id: review.reviewer_id.clone(),
            comment: review.comment.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectStatistics {
    pub subject_id: SubjectId,
    pub total_count: u64,
    pub mean: f64,
    pub histogram: ScoreHistogram,
    /// Newest first.
    pub recent: Vec<ReviewSummary>,
    pub generated_at: DateTime<Utc>,
}

impl SubjectStatistics {
    /// Builds statistics from `reviews`, which must be ordered newest first.
    pub fn from_reviews(subject_id: SubjectId, reviews: &[ReviewRecord]) -> Self {
        let mut histogram = ScoreHistogram::default();
        let mut recent = Vec::with_capacity(RECENT_LIMIT);
        let mut sum = 0.0;
        let mut total_count = 0u64;

        for review in reviews {
            let Some(score) = ReviewFilter::score(review) else {
                continue;
            };
            sum += score;
            total_count += 1;
            histogram.record(score);
            if recent.len() < RECENT_LIMIT {
                recent.push(ReviewSummary::from_review(review, score));
            }
        }

        let mean = if total_count == 0 {
            0.0
        } else {
            round2(sum / total_count as f64)
        };

        Self {
            subject_id,
            total_count,
            mean,
            histogram,
            recent,
            generated_at: Utc::now(),
        }
    }
}

/// Read-only statistics over a subject's live reviews.
///
/// Never reads the persisted aggregate, so the result can briefly differ
/// from the canonical record while a recompute is in flight.
#[derive(Clone)]
pub struct StatsQuery<S: DocumentStore> {
    store: S,
}

impl<S: DocumentStore> StatsQuery<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self, subject_id), fields(subject_id = %subject_id))]
    pub async fn get(&self, subject_id: &SubjectId) -> Result<SubjectStatistics> {
        let reviews = self
            .store
            .reviews_for_subject(ReviewQuery::for_subject(subject_id.clone()).newest_first())
            .await?;

        let stats = SubjectStatistics::from_reviews(subject_id.clone(), &reviews);
        tracing::debug!(
            count = stats.total_count,
            mean = stats.mean,
            "statistics computed"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use doc_store::{InMemoryDocumentStore, SubjectRecord};

    use super::*;

    #[test]
    fn histogram_rounds_scores_into_buckets() {
        let mut histogram = ScoreHistogram::default();
        for score in [0.4, 1.0, 1.49, 2.5, 4.6, 5.0] {
            histogram.record(score);
        }
        assert_eq!(histogram.get(1), 2);
        assert_eq!(histogram.get(2), 0);
        assert_eq!(histogram.get(3), 1);
        assert_eq!(histogram.get(5), 2);
        assert_eq!(histogram.total(), 5);
    }

    #[test]
    fn histogram_serializes_as_star_map() {
        let mut histogram = ScoreHistogram::default();
        histogram.record(4.0);
        histogram.record(4.2);

        let json = serde_json::to_value(histogram).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "1": 0, "2": 0, "3": 0, "4": 2, "5": 0 })
        );
        let back: ScoreHistogram = serde_json::from_value(json).unwrap();
        assert_eq!(back, histogram);
    }

    #[test]
    fn histogram_rejects_unknown_bucket() {
        let result = serde_json::from_value::<ScoreHistogram>(serde_json::json!({ "6": 1 }));
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn statistics_use_only_counted_reviews() {
        let store = InMemoryDocumentStore::new();
        let now = Utc::now();
        let reviews = [
            ReviewRecord::user_review("u1", 5.0).with_created_at(now - Duration::minutes(3)),
            ReviewRecord::user_review("u1", 3.0).with_created_at(now - Duration::minutes(2)),
            ReviewRecord::user_review("u1", 1.0)
                .with_visible(false)
                .with_created_at(now - Duration::minutes(1)),
            ReviewRecord::user_review("u1", 4.0)
                .deleted_at(now)
                .with_created_at(now),
        ];
        for review in reviews {
            store.put_review(review).await.unwrap();
        }

        let stats = StatsQuery::new(store).get(&"u1".into()).await.unwrap();
        assert_eq!(stats.total_count, 2);
        assert_eq!(stats.mean, 4.0);
        assert_eq!(stats.histogram.get(5), 1);
        assert_eq!(stats.histogram.get(3), 1);
        assert_eq!(stats.histogram.get(1), 0);
        let recent: Vec<f64> = stats.recent.iter().map(|r| r.score).collect();
        assert_eq!(recent, vec![3.0, 5.0]);
    }

    #[tokio::test]
    async fn recent_is_newest_first_and_capped() {
        let store = InMemoryDocumentStore::new();
        let start = Utc::now();
        for i in 0..8 {
            store
                .put_review(
                    ReviewRecord::user_review("u1", 4.0)
                        .with_id(format!("r{i}"))
                        .with_created_at(start + Duration::seconds(i))
                        .with_reviewer(format!("reviewer-{i}")),
                )
                .await
                .unwrap();
        }

        let stats = StatsQuery::new(store).get(&"u1".into()).await.unwrap();
        assert_eq!(stats.total_count, 8);
        let ids: Vec<&str> = stats.recent.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r7", "r6", "r5", "r4", "r3"]);
        assert_eq!(stats.recent[0].reviewer_id.as_deref(), Some("reviewer-7"));
    }

    #[tokio::test]
    async fn statistics_ignore_the_persisted_aggregate() {
        let store = InMemoryDocumentStore::new();
        let mut stale = SubjectRecord::new("u1");
        stale.mean_score = 1.0;
        stale.review_count = 40;
        store.put_subject(stale).await.unwrap();
        store
            .put_review(ReviewRecord::user_review("u1", 4.5))
            .await
            .unwrap();

        let stats = StatsQuery::new(store).get(&"u1".into()).await.unwrap();
        assert_eq!(stats.total_count, 1);
        assert_eq!(stats.mean, 4.5);
    }

    #[tokio::test]
    async fn unknown_subject_has_empty_statistics() {
        let stats = StatsQuery::new(InMemoryDocumentStore::new())
            .get(&"nobody".into())
            .await
            .unwrap();
        assert_eq!(stats.total_count, 0);
        assert_eq!(stats.mean, 0.0);
        assert_eq!(stats.histogram, ScoreHistogram::default());
        assert!(stats.recent.is_empty());
    }

    #[test]
    fn statistics_wire_format() {
        let stats = SubjectStatistics::from_reviews(
            "u1".into(),
            &[ReviewRecord::user_review("u1", 4.0).with_comment("great")],
        );
        let json = serde_json::to_value(&stats).unwrap();

        assert_eq!(json["subjectId"], "u1");
        assert_eq!(json["totalCount"], 1);
        assert_eq!(json["mean"], 4.0);
        assert_eq!(json["histogram"]["4"], 1);
        assert_eq!(json["recent"][0]["comment"], "great");
        assert!(json["recent"][0].get("reviewerId").is_none());
        assert!(json.get("generatedAt").is_some());
    }
}
