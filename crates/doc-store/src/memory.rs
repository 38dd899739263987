use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    BatchWrite, DEFAULT_MAX_BATCH_SIZE, OwnedRecord, Page, PageRequest, RecordId, ReputationUpdate,
    Result, ReviewId, ReviewOrder, ReviewQuery, ReviewRecord, StoreError, SubjectId, SubjectRecord,
    WriteBatch, store::DocumentStore,
};

#[derive(Debug, Default)]
struct Collections {
    reviews: BTreeMap<ReviewId, ReviewRecord>,
    subjects: BTreeMap<SubjectId, SubjectRecord>,
    owned: BTreeMap<RecordId, OwnedRecord>,
    batches_committed: usize,
}

/// Failures injected by tests.
#[derive(Debug, Default)]
struct FailurePlan {
    fail_reads: bool,
    fail_subject_updates: HashSet<SubjectId>,
    /// 1-based index of the next commit to fail, counted from when it was set.
    fail_batch_number: Option<usize>,
    batches_seen: usize,
}

/// In-memory document store implementation for testing.
///
/// Provides the same interface as the PostgreSQL implementation. All
/// collections live behind one lock, so a batch commit is applied under a
/// single write guard and is never observed half-applied.
#[derive(Clone)]
pub struct InMemoryDocumentStore {
    collections: Arc<RwLock<Collections>>,
    failures: Arc<RwLock<FailurePlan>>,
    max_batch_size: usize,
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self {
            collections: Arc::default(),
            failures: Arc::default(),
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }
}

impl InMemoryDocumentStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the atomic batch limit.
    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = max_batch_size.max(1);
        self
    }

    /// Physically removes a review.
    pub async fn remove_review(&self, review_id: &ReviewId) -> Option<ReviewRecord> {
        self.collections.write().await.reviews.remove(review_id)
    }

    /// Returns the number of stored reviews.
    pub async fn review_count(&self) -> usize {
        self.collections.read().await.reviews.len()
    }

    /// Returns the number of batches committed so far.
    pub async fn batches_committed(&self) -> usize {
        self.collections.read().await.batches_committed
    }

    /// Makes every review and subject listing read fail.
    pub async fn set_fail_reads(&self, fail: bool) {
        self.failures.write().await.fail_reads = fail;
    }

    /// Makes reputation updates for one subject fail.
    pub async fn fail_subject_updates_for(&self, subject_id: SubjectId) {
        self.failures
            .write()
            .await
            .fail_subject_updates
            .insert(subject_id);
    }

    /// Makes the `n`th batch commit from now fail (1-based).
    pub async fn fail_batch_number(&self, n: usize) {
        let mut failures = self.failures.write().await;
        failures.fail_batch_number = Some(n);
        failures.batches_seen = 0;
    }

    /// Clears all injected failures.
    pub async fn clear_failures(&self) {
        *self.failures.write().await = FailurePlan::default();
    }

    /// Clears all collections.
    pub async fn clear(&self) {
        *self.collections.write().await = Collections::default();
    }

    async fn check_reads(&self) -> Result<()> {
        if self.failures.read().await.fail_reads {
            return Err(StoreError::Unavailable("injected read failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn reviews_for_subject(&self, query: ReviewQuery) -> Result<Vec<ReviewRecord>> {
        self.check_reads().await?;

        let collections = self.collections.read().await;
        let mut reviews: Vec<_> = collections
            .reviews
            .values()
            .filter(|r| r.subject_id.as_ref() == Some(&query.subject_id) && r.is_user_review())
            .cloned()
            .collect();

        if query.order == ReviewOrder::NewestFirst {
            // Ties keep id order, matching the PostgreSQL backend.
            reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        }
        if let Some(limit) = query.limit {
            reviews.truncate(limit);
        }

        Ok(reviews)
    }

    async fn put_review(&self, review: ReviewRecord) -> Result<()> {
        self.collections
            .write()
            .await
            .reviews
            .insert(review.id.clone(), review);
        Ok(())
    }

    async fn get_subject(&self, subject_id: &SubjectId) -> Result<Option<SubjectRecord>> {
        Ok(self
            .collections
            .read()
            .await
            .subjects
            .get(subject_id)
            .cloned())
    }

    async fn put_subject(&self, subject: SubjectRecord) -> Result<()> {
        self.collections
            .write()
            .await
            .subjects
            .insert(subject.id.clone(), subject);
        Ok(())
    }

    async fn update_subject_reputation(
        &self,
        subject_id: &SubjectId,
        update: ReputationUpdate,
    ) -> Result<()> {
        if self
            .failures
            .read()
            .await
            .fail_subject_updates
            .contains(subject_id)
        {
            return Err(StoreError::Unavailable(format!(
                "injected update failure for subject {subject_id}"
            )));
        }

        let mut collections = self.collections.write().await;
        let subject = collections
            .subjects
            .get_mut(subject_id)
            .ok_or_else(|| StoreError::SubjectNotFound(subject_id.clone()))?;

        subject.mean_score = update.mean_score;
        subject.review_count = update.review_count;
        subject.updated_at = Some(update.updated_at);
        Ok(())
    }

    async fn list_active_subjects(&self, page: PageRequest) -> Result<Page<SubjectId>> {
        self.check_reads().await?;

        let collections = self.collections.read().await;
        let items: Vec<_> = collections
            .subjects
            .values()
            .filter(|s| s.active)
            .filter(|s| page.after.as_ref().is_none_or(|after| &s.id > after))
            .take(page.limit)
            .map(|s| s.id.clone())
            .collect();

        let next = if items.len() == page.limit {
            items.last().cloned()
        } else {
            None
        };

        Ok(Page { items, next })
    }

    async fn put_owned_record(&self, record: OwnedRecord) -> Result<()> {
        self.collections
            .write()
            .await
            .owned
            .insert(record.id.clone(), record);
        Ok(())
    }

    async fn get_owned_record(&self, record_id: &RecordId) -> Result<Option<OwnedRecord>> {
        Ok(self.collections.read().await.owned.get(record_id).cloned())
    }

    async fn owned_record_ids(&self, owner_id: &SubjectId) -> Result<Vec<RecordId>> {
        self.check_reads().await?;

        Ok(self
            .collections
            .read()
            .await
            .owned
            .values()
            .filter(|r| &r.owner_id == owner_id)
            .map(|r| r.id.clone())
            .collect())
    }

    async fn commit_batch(&self, batch: WriteBatch) -> Result<()> {
        if batch.len() > self.max_batch_size {
            return Err(StoreError::BatchTooLarge {
                size: batch.len(),
                limit: self.max_batch_size,
            });
        }

        {
            let mut failures = self.failures.write().await;
            failures.batches_seen += 1;
            if failures.fail_batch_number == Some(failures.batches_seen) {
                return Err(StoreError::Unavailable(format!(
                    "injected failure on batch {}",
                    failures.batches_seen
                )));
            }
        }

        let mut collections = self.collections.write().await;

        // Validate everything before touching anything.
        for write in batch.writes() {
            if !collections.owned.contains_key(write.record_id()) {
                return Err(StoreError::RecordNotFound(write.record_id().clone()));
            }
        }

        for write in batch.into_writes() {
            match write {
                BatchWrite::SetOwnerMeanScore {
                    record_id,
                    owner_mean_score,
                    updated_at,
                } => {
                    if let Some(record) = collections.owned.get_mut(&record_id) {
                        record.owner_mean_score = Some(owner_mean_score);
                        record.updated_at = Some(updated_at);
                    }
                }
            }
        }
        collections.batches_committed += 1;

        Ok(())
    }

    fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }
}
