use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    OwnedRecord, Page, PageRequest, RecordId, ReputationUpdate, Result, ReviewQuery, ReviewRecord,
    SubjectId, SubjectRecord,
};

/// Default maximum number of writes a store applies in one atomic batch.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 500;

/// A single write inside a [`WriteBatch`].
#[derive(Debug, Clone, PartialEq)]
pub enum BatchWrite {
    /// Overwrites the mirrored owner mean score of an owned record.
    SetOwnerMeanScore {
        record_id: RecordId,
        owner_mean_score: f64,
        updated_at: DateTime<Utc>,
    },
}

impl BatchWrite {
    pub fn record_id(&self) -> &RecordId {
        match self {
            BatchWrite::SetOwnerMeanScore { record_id, .. } => record_id,
        }
    }
}

/// An ordered set of writes applied all-or-nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    writes: Vec<BatchWrite>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, write: BatchWrite) {
        self.writes.push(write);
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn writes(&self) -> &[BatchWrite] {
        &self.writes
    }

    pub fn into_writes(self) -> Vec<BatchWrite> {
        self.writes
    }
}

impl FromIterator<BatchWrite> for WriteBatch {
    fn from_iter<I: IntoIterator<Item = BatchWrite>>(iter: I) -> Self {
        Self {
            writes: iter.into_iter().collect(),
        }
    }
}

/// Core trait for document store implementations.
///
/// The store holds three collections: review records, canonical subject
/// records and records owned by subjects. All implementations must be
/// thread-safe (Send + Sync). Writes are last-writer-wins; no method takes
/// an application-level lock.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Retrieves the user reviews of a subject.
    ///
    /// Only reviews whose `subjectType` is user are returned; no other
    /// filtering is applied.
    async fn reviews_for_subject(&self, query: ReviewQuery) -> Result<Vec<ReviewRecord>>;

    /// Inserts or replaces a review record.
    async fn put_review(&self, review: ReviewRecord) -> Result<()>;

    /// Retrieves a canonical subject record.
    ///
    /// Returns None if the subject doesn't exist.
    async fn get_subject(&self, subject_id: &SubjectId) -> Result<Option<SubjectRecord>>;

    /// Inserts or replaces a canonical subject record.
    async fn put_subject(&self, subject: SubjectRecord) -> Result<()>;

    /// Overwrites the reputation fields of an existing subject record.
    ///
    /// Fails with `SubjectNotFound` if the record does not exist; a missing
    /// record is never created here.
    async fn update_subject_reputation(
        &self,
        subject_id: &SubjectId,
        update: ReputationUpdate,
    ) -> Result<()>;

    /// Lists active subject ids in ascending id order, one page at a time.
    async fn list_active_subjects(&self, page: PageRequest) -> Result<Page<SubjectId>>;

    /// Inserts or replaces an owned record.
    async fn put_owned_record(&self, record: OwnedRecord) -> Result<()>;

    /// Retrieves an owned record.
    async fn get_owned_record(&self, record_id: &RecordId) -> Result<Option<OwnedRecord>>;

    /// Lists the ids of every record owned by a subject.
    async fn owned_record_ids(&self, owner_id: &SubjectId) -> Result<Vec<RecordId>>;

    /// Applies a batch of writes atomically.
    ///
    /// Either every write is applied or none is. Batches larger than
    /// [`DocumentStore::max_batch_size`] are rejected with `BatchTooLarge`.
    async fn commit_batch(&self, batch: WriteBatch) -> Result<()>;

    /// Maximum number of writes accepted by [`DocumentStore::commit_batch`].
    fn max_batch_size(&self) -> usize {
        DEFAULT_MAX_BATCH_SIZE
    }
}

/// Extension trait providing convenience methods for document stores.
#[async_trait]
pub trait DocumentStoreExt: DocumentStore {
    /// Checks if a canonical subject record exists.
    async fn subject_exists(&self, subject_id: &SubjectId) -> Result<bool> {
        Ok(self.get_subject(subject_id).await?.is_some())
    }

    /// Retrieves every record owned by a subject.
    async fn owned_records(&self, owner_id: &SubjectId) -> Result<Vec<OwnedRecord>> {
        let mut records = Vec::new();
        for id in self.owned_record_ids(owner_id).await? {
            if let Some(record) = self.get_owned_record(&id).await? {
                records.push(record);
            }
        }
        Ok(records)
    }
}

// Blanket implementation for all DocumentStore implementations
impl<T: DocumentStore + ?Sized> DocumentStoreExt for T {}
