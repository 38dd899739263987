//! Store doubles shared by unit tests.

use std::time::Duration;

use async_trait::async_trait;
use common::{RecordId, SubjectId};
use doc_store::{
    DocumentStore, InMemoryDocumentStore, OwnedRecord, Page, PageRequest, ReputationUpdate,
    ReviewQuery, ReviewRecord, SubjectRecord, WriteBatch,
};

type StoreResult<T> = doc_store::Result<T>;

/// Delegates to the in-memory store, but takes its time reading reviews.
#[derive(Clone)]
pub struct SlowStore {
    inner: InMemoryDocumentStore,
    delay: Duration,
}

impl SlowStore {
    pub fn new(inner: InMemoryDocumentStore, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl DocumentStore for SlowStore {
    async fn reviews_for_subject(&self, query: ReviewQuery) -> StoreResult<Vec<ReviewRecord>> {
        tokio::time::sleep(self.delay).await;
        self.inner.reviews_for_subject(query).await
    }

    async fn put_review(&self, review: ReviewRecord) -> StoreResult<()> {
        self.inner.put_review(review).await
    }

    async fn get_subject(&self, subject_id: &SubjectId) -> StoreResult<Option<SubjectRecord>> {
        self.inner.get_subject(subject_id).await
    }

    async fn put_subject(&self, subject: SubjectRecord) -> StoreResult<()> {
        self.inner.put_subject(subject).await
    }

    async fn update_subject_reputation(
        &self,
        subject_id: &SubjectId,
        update: ReputationUpdate,
    ) -> StoreResult<()> {
        self.inner.update_subject_reputation(subject_id, update).await
    }

    async fn list_active_subjects(&self, page: PageRequest) -> StoreResult<Page<SubjectId>> {
        self.inner.list_active_subjects(page).await
    }

    async fn put_owned_record(&self, record: OwnedRecord) -> StoreResult<()> {
        self.inner.put_owned_record(record).await
    }

    async fn get_owned_record(&self, record_id: &RecordId) -> StoreResult<Option<OwnedRecord>> {
        self.inner.get_owned_record(record_id).await
    }

    async fn owned_record_ids(&self, owner_id: &SubjectId) -> StoreResult<Vec<RecordId>> {
        self.inner.owned_record_ids(owner_id).await
    }

    async fn commit_batch(&self, batch: WriteBatch) -> StoreResult<()> {
        self.inner.commit_batch(batch).await
    }
}
