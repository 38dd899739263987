//! Recomputes a subject's reputation from its current reviews.

use common::SubjectId;
use doc_store::{DocumentStore, ReviewQuery, ReviewRecord};
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::filter::ReviewFilter;

/// Rounds to two decimals, halves away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// A subject's aggregate reputation: mean score and number of counted reviews.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reputation {
    pub mean: f64,
    pub count: u64,
}

impl Reputation {
    /// The reputation of a subject with no counted reviews.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Aggregates the counted reviews among `reviews`.
    ///
    /// The mean is rounded with [`round2`]; an empty set yields `(0, 0)`.
    pub fn from_reviews<'a>(reviews: impl IntoIterator<Item = &'a ReviewRecord>) -> Self {
        let (sum, count) = reviews
            .into_iter()
            .filter_map(ReviewFilter::score)
            .fold((0.0_f64, 0_u64), |(sum, count), score| {
                (sum + score, count + 1)
            });

        if count == 0 {
            return Self::empty();
        }

        Self {
            mean: round2(sum / count as f64),
            count,
        }
    }
}

impl std::fmt::Display for Reputation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2} ({} reviews)", self.mean, self.count)
    }
}

/// Recomputes reputations from the full current review set of a subject.
///
/// Results depend only on the store's contents at read time, so running a
/// recompute any number of times, in any order, converges on the same value.
/// Store failures are returned as-is; retrying is the caller's decision.
#[derive(Clone)]
pub struct Aggregator<S: DocumentStore> {
    store: S,
}

impl<S: DocumentStore> Aggregator<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self, subject_id), fields(subject_id = %subject_id))]
    pub async fn recompute(&self, subject_id: &SubjectId) -> Result<Reputation> {
        let reviews = self
            .store
            .reviews_for_subject(ReviewQuery::for_subject(subject_id.clone()))
            .await?;

        let reputation = Reputation::from_reviews(&reviews);
        tracing::debug!(
            fetched = reviews.len(),
            count = reputation.count,
            mean = reputation.mean,
            "reputation recomputed"
        );

        Ok(reputation)
    }
}
