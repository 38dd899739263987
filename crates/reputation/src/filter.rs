//! Predicate deciding which reviews count toward a reputation.

use doc_store::ReviewRecord;

/// Lowest score a counted review may carry.
pub const MIN_SCORE: f64 = 0.0;

/// Highest score a counted review may carry.
pub const MAX_SCORE: f64 = 5.0;

/// Decides whether a review counts toward its subject's reputation.
///
/// A review counts only when it is a visible, non-deleted user review with
/// a score in `[MIN_SCORE, MAX_SCORE]`. Aggregation and statistics both go
/// through this filter so they never disagree on the review set.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReviewFilter;

impl ReviewFilter {
    pub fn counts(review: &ReviewRecord) -> bool {
        if review.subject_id.is_none() || !review.is_user_review() {
            return false;
        }
        if review.deletion.is_deleted() || !review.visible {
            return false;
        }
        Self::counted_score(review).is_some()
    }

    /// Returns the score of a counting review.
    pub fn score(review: &ReviewRecord) -> Option<f64> {
        if Self::counts(review) {
            review.score
        } else {
            None
        }
    }

    fn counted_score(review: &ReviewRecord) -> Option<f64> {
        // NaN fails both comparisons.
        review
            .score
            .filter(|score| *score >= MIN_SCORE && *score <= MAX_SCORE)
    }
}
