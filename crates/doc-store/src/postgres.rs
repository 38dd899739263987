use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::{
    BatchWrite, Deletion, OwnedRecord, Page, PageRequest, RecordId, ReputationUpdate, Result,
    ReviewOrder, ReviewQuery, ReviewRecord, StoreError, SubjectId, SubjectRecord, SubjectType,
    WriteBatch,
    store::{DEFAULT_MAX_BATCH_SIZE, DocumentStore},
};

const REVIEW_COLUMNS: &str =
    "id, subject_id, subject_type, score, visible, deleted_at, created_at, reviewer_id, comment";

/// PostgreSQL-backed document store implementation.
#[derive(Clone)]
pub struct PostgresDocumentStore {
    pool: PgPool,
    max_batch_size: usize,
}

impl PostgresDocumentStore {
    /// Creates a new PostgreSQL document store.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }

    /// Connects a pool to `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Overrides the atomic batch limit.
    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = max_batch_size.max(1);
        self
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_review(row: PgRow) -> Result<ReviewRecord> {
        Ok(ReviewRecord {
            id: row.try_get::<String, _>("id")?.into(),
            subject_id: row
                .try_get::<Option<String>, _>("subject_id")?
                .map(SubjectId::from),
            subject_type: row
                .try_get::<Option<String>, _>("subject_type")?
                .map(SubjectType::from),
            score: row.try_get("score")?,
            visible: row.try_get("visible")?,
            deletion: Deletion::from(row.try_get::<Option<DateTime<Utc>>, _>("deleted_at")?),
            created_at: row.try_get("created_at")?,
            reviewer_id: row.try_get("reviewer_id")?,
            comment: row.try_get("comment")?,
        })
    }

    fn row_to_subject(row: PgRow) -> Result<SubjectRecord> {
        let review_count: i64 = row.try_get("review_count")?;
        Ok(SubjectRecord {
            id: row.try_get::<String, _>("id")?.into(),
            active: row.try_get("active")?,
            mean_score: row.try_get("mean_score")?,
            review_count: u64::try_from(review_count).unwrap_or_default(),
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_owned(row: PgRow) -> Result<OwnedRecord> {
        Ok(OwnedRecord {
            id: row.try_get::<String, _>("id")?.into(),
            owner_id: row.try_get::<String, _>("owner_id")?.into(),
            owner_mean_score: row.try_get("owner_mean_score")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    async fn reviews_for_subject(&self, query: ReviewQuery) -> Result<Vec<ReviewRecord>> {
        let mut sql = format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE subject_id = $1 AND subject_type = ANY($2)"
        );
        if query.order == ReviewOrder::NewestFirst {
            sql.push_str(" ORDER BY created_at DESC, id");
        }
        if query.limit.is_some() {
            sql.push_str(" LIMIT $3");
        }

        let user_types = vec![
            SubjectType::USER.to_string(),
            SubjectType::LEGACY_USER.to_string(),
        ];
        let mut sqlx_query = sqlx::query(&sql)
            .bind(query.subject_id.as_str())
            .bind(user_types);
        if let Some(limit) = query.limit {
            sqlx_query = sqlx_query.bind(i64::try_from(limit).unwrap_or(i64::MAX));
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_review).collect()
    }

    async fn put_review(&self, review: ReviewRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reviews (id, subject_id, subject_type, score, visible, deleted_at, created_at, reviewer_id, comment)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO UPDATE SET
                subject_id = EXCLUDED.subject_id,
                subject_type = EXCLUDED.subject_type,
                score = EXCLUDED.score,
                visible = EXCLUDED.visible,
                deleted_at = EXCLUDED.deleted_at,
                created_at = EXCLUDED.created_at,
                reviewer_id = EXCLUDED.reviewer_id,
                comment = EXCLUDED.comment
            "#,
        )
        .bind(review.id.as_str())
        .bind(review.subject_id.as_ref().map(SubjectId::as_str))
        .bind(review.subject_type.as_ref().map(SubjectType::as_str))
        .bind(review.score)
        .bind(review.visible)
        .bind(review.deletion.deleted_at())
        .bind(review.created_at)
        .bind(&review.reviewer_id)
        .bind(&review.comment)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_subject(&self, subject_id: &SubjectId) -> Result<Option<SubjectRecord>> {
        let row: Option<PgRow> = sqlx::query(
            "SELECT id, active, mean_score, review_count, updated_at FROM subjects WHERE id = $1",
        )
        .bind(subject_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_subject).transpose()
    }

    async fn put_subject(&self, subject: SubjectRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO subjects (id, active, mean_score, review_count, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE SET
                active = EXCLUDED.active,
                mean_score = EXCLUDED.mean_score,
                review_count = EXCLUDED.review_count,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(subject.id.as_str())
        .bind(subject.active)
        .bind(subject.mean_score)
        .bind(i64::try_from(subject.review_count).unwrap_or(i64::MAX))
        .bind(subject.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_subject_reputation(
        &self,
        subject_id: &SubjectId,
        update: ReputationUpdate,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE subjects SET mean_score = $2, review_count = $3, updated_at = $4 WHERE id = $1",
        )
        .bind(subject_id.as_str())
        .bind(update.mean_score)
        .bind(i64::try_from(update.review_count).unwrap_or(i64::MAX))
        .bind(update.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::SubjectNotFound(subject_id.clone()));
        }
        Ok(())
    }

    async fn list_active_subjects(&self, page: PageRequest) -> Result<Page<SubjectId>> {
        let ids: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT id FROM subjects
            WHERE active AND ($1::TEXT IS NULL OR id > $1)
            ORDER BY id ASC
            LIMIT $2
            "#,
        )
        .bind(page.after.as_ref().map(SubjectId::as_str))
        .bind(i64::try_from(page.limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        let items: Vec<SubjectId> = ids.into_iter().map(SubjectId::from).collect();
        let next = if items.len() == page.limit {
            items.last().cloned()
        } else {
            None
        };

        Ok(Page { items, next })
    }

    async fn put_owned_record(&self, record: OwnedRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO owned_records (id, owner_id, owner_mean_score, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO UPDATE SET
                owner_id = EXCLUDED.owner_id,
                owner_mean_score = EXCLUDED.owner_mean_score,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(record.id.as_str())
        .bind(record.owner_id.as_str())
        .bind(record.owner_mean_score)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_owned_record(&self, record_id: &RecordId) -> Result<Option<OwnedRecord>> {
        let row: Option<PgRow> = sqlx::query(
            "SELECT id, owner_id, owner_mean_score, updated_at FROM owned_records WHERE id = $1",
        )
        .bind(record_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_owned).transpose()
    }

    async fn owned_record_ids(&self, owner_id: &SubjectId) -> Result<Vec<RecordId>> {
        let ids: Vec<String> =
            sqlx::query_scalar("SELECT id FROM owned_records WHERE owner_id = $1 ORDER BY id")
                .bind(owner_id.as_str())
                .fetch_all(&self.pool)
                .await?;

        Ok(ids.into_iter().map(RecordId::from).collect())
    }

    async fn commit_batch(&self, batch: WriteBatch) -> Result<()> {
        if batch.len() > self.max_batch_size {
            return Err(StoreError::BatchTooLarge {
                size: batch.len(),
                limit: self.max_batch_size,
            });
        }

        let writes = batch.len();
        // Dropping the transaction without commit rolls it back.
        let mut tx = self.pool.begin().await?;

        for write in batch.into_writes() {
            match write {
                BatchWrite::SetOwnerMeanScore {
                    record_id,
                    owner_mean_score,
                    updated_at,
                } => {
                    let result = sqlx::query(
                        "UPDATE owned_records SET owner_mean_score = $2, updated_at = $3 WHERE id = $1",
                    )
                    .bind(record_id.as_str())
                    .bind(owner_mean_score)
                    .bind(updated_at)
                    .execute(&mut *tx)
                    .await?;

                    if result.rows_affected() == 0 {
                        return Err(StoreError::RecordNotFound(record_id));
                    }
                }
            }
        }

        tx.commit().await?;
        tracing::debug!(writes, "batch committed");
        Ok(())
    }

    fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }
}
