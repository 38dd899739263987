//! Writes a recomputed reputation to the canonical record and its copies.

use chrono::Utc;
use common::SubjectId;
use doc_store::{BatchWrite, DocumentStore, ReputationUpdate, WriteBatch};

use crate::Result;
use crate::aggregator::Reputation;

/// What a successful propagation wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PropagationReport {
    /// Owned records that now mirror the new mean.
    pub copies_updated: usize,
    /// Atomic batches committed for the fan-out.
    pub batches_committed: usize,
}

/// Propagates a reputation to the canonical subject record, then fans the
/// mean out to every record the subject owns.
///
/// Fan-out batches are atomic individually but not as a group: when batch k
/// fails, batches before it stay committed and later ones are not
/// attempted. Every write is a plain overwrite derived from the reputation
/// alone, so re-running `apply` after a partial failure converges.
#[derive(Clone)]
pub struct Propagator<S: DocumentStore> {
    store: S,
    fanout_batch_size: usize,
}

impl<S: DocumentStore> Propagator<S> {
    pub fn new(store: S) -> Self {
        let fanout_batch_size = store.max_batch_size();
        Self {
            store,
            fanout_batch_size,
        }
    }

    /// Caps fan-out batches below the store limit.
    pub fn with_fanout_batch_size(mut self, size: usize) -> Self {
        self.fanout_batch_size = size.max(1);
        self
    }

    fn batch_size(&self) -> usize {
        self.fanout_batch_size.min(self.store.max_batch_size()).max(1)
    }

    #[tracing::instrument(skip(self, subject_id, reputation), fields(subject_id = %subject_id, mean = reputation.mean, count = reputation.count))]
    pub async fn apply(
        &self,
        subject_id: &SubjectId,
        reputation: Reputation,
    ) -> Result<PropagationReport> {
        let updated_at = Utc::now();

        // A missing subject aborts here, before any copy is touched.
        self.store
            .update_subject_reputation(
                subject_id,
                ReputationUpdate {
                    mean_score: reputation.mean,
                    review_count: reputation.count,
                    updated_at,
                },
            )
            .await?;

        let record_ids = self.store.owned_record_ids(subject_id).await?;
        let mut report = PropagationReport::default();

        for chunk in record_ids.chunks(self.batch_size()) {
            let batch: WriteBatch = chunk
                .iter()
                .map(|record_id| BatchWrite::SetOwnerMeanScore {
                    record_id: record_id.clone(),
                    owner_mean_score: reputation.mean,
                    updated_at,
                })
                .collect();

            if let Err(e) = self.store.commit_batch(batch).await {
                tracing::warn!(
                    batch = report.batches_committed + 1,
                    committed = report.copies_updated,
                    remaining = record_ids.len() - report.copies_updated,
                    error = %e,
                    "fan-out batch failed"
                );
                return Err(e.into());
            }

            report.batches_committed += 1;
            report.copies_updated += chunk.len();
            metrics::counter!("reputation_fanout_records_total").increment(chunk.len() as u64);
        }

        tracing::debug!(
            copies = report.copies_updated,
            batches = report.batches_committed,
            "reputation propagated"
        );

        Ok(report)
    }
}
