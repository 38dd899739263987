//! Full recompute over every active subject.

use std::time::Instant;

use common::SubjectId;
use doc_store::{DocumentStore, PageRequest};
use futures_util::{StreamExt, stream};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::config::ReputationConfig;
use crate::pipeline::{RecomputePipeline, Recomputed};
use crate::{ReputationError, Result};

/// Counters describing a full recompute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    /// Subjects recomputed and propagated successfully.
    pub processed: usize,
    /// Subjects whose recompute or propagation failed.
    pub errors: usize,
    /// Subjects listed but never started because the run was cancelled.
    pub skipped: usize,
    /// Subjects listed.
    pub total: usize,
    pub cancelled: bool,
}

impl BatchSummary {
    pub fn finished(&self) -> usize {
        self.processed + self.errors
    }
}

/// Progress of one full recompute, owned by whoever drives it.
///
/// The cursor advances only after a page is fully handled, so a run that
/// stopped on a listing failure can be resumed with the same `BatchRun`.
#[derive(Debug, Clone, Default)]
pub struct BatchRun {
    pub summary: BatchSummary,
    cursor: Option<SubjectId>,
    done: bool,
}

impl BatchRun {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last subject id of the most recent completed page.
    pub fn cursor(&self) -> Option<&SubjectId> {
        self.cursor.as_ref()
    }

    /// True once every page has been listed and handled.
    pub fn is_done(&self) -> bool {
        self.done
    }
}

/// Result of one subject inside a full recompute.
#[derive(Debug)]
pub enum SubjectOutcome {
    Processed(SubjectId, Recomputed),
    Failed(SubjectId, ReputationError),
    Skipped(SubjectId),
}

/// Walks every active subject page by page and recomputes each one.
///
/// One subject's failure never stops the run; it is counted and logged.
#[derive(Clone)]
pub struct BatchCoordinator<S: DocumentStore> {
    store: S,
    pipeline: RecomputePipeline<S>,
    config: ReputationConfig,
}

impl<S: DocumentStore + Clone> BatchCoordinator<S> {
    pub fn new(store: S, config: ReputationConfig) -> Self {
        let pipeline = RecomputePipeline::new(store.clone(), &config);
        Self {
            store,
            pipeline,
            config,
        }
    }
}

impl<S: DocumentStore> BatchCoordinator<S> {
    pub fn config(&self) -> &ReputationConfig {
        &self.config
    }

    /// Runs a full recompute from the first page.
    #[tracing::instrument(skip(self, shutdown))]
    pub async fn recompute_all(&self, shutdown: watch::Receiver<bool>) -> Result<BatchSummary> {
        let mut run = BatchRun::new();
        self.run(&mut run, shutdown).await?;

        tracing::info!(
            processed = run.summary.processed,
            errors = run.summary.errors,
            skipped = run.summary.skipped,
            total = run.summary.total,
            cancelled = run.summary.cancelled,
            "full recompute finished"
        );
        Ok(run.summary)
    }

    /// Continues `run` from its cursor until every page is handled, the run
    /// is cancelled, or listing a page fails.
    pub async fn run(&self, run: &mut BatchRun, shutdown: watch::Receiver<bool>) -> Result<()> {
        let started = Instant::now();
        let result = self.drive(run, &shutdown).await;
        metrics::histogram!("reputation_batch_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        result
    }

    async fn drive(&self, run: &mut BatchRun, shutdown: &watch::Receiver<bool>) -> Result<()> {
        let page_size = self.config.page_size.max(1);

        while !run.done {
            if *shutdown.borrow() {
                run.summary.cancelled = true;
                break;
            }

            let request = match run.cursor.clone() {
                Some(cursor) => PageRequest::after(cursor, page_size),
                None => PageRequest::first(page_size),
            };
            let page = self.store.list_active_subjects(request).await.map_err(|e| {
                tracing::error!(
                    cursor = ?run.cursor,
                    processed = run.summary.processed,
                    error = %e,
                    "listing subjects failed, aborting full recompute"
                );
                ReputationError::from(e)
            })?;

            run.summary.total += page.items.len();
            self.process_page(run, page.items, shutdown).await;

            match page.next {
                Some(next) => run.cursor = Some(next),
                None => run.done = true,
            }
        }

        Ok(())
    }

    async fn process_page(
        &self,
        run: &mut BatchRun,
        subjects: Vec<SubjectId>,
        shutdown: &watch::Receiver<bool>,
    ) {
        let mut outcomes = stream::iter(subjects)
            .map(|subject_id| self.process_subject(subject_id, shutdown))
            .buffer_unordered(self.config.concurrency.max(1));

        while let Some(outcome) = outcomes.next().await {
            match outcome {
                SubjectOutcome::Processed(..) => run.summary.processed += 1,
                SubjectOutcome::Failed(subject_id, e) => {
                    tracing::warn!(subject_id = %subject_id, error = %e, "subject recompute failed");
                    run.summary.errors += 1;
                }
                SubjectOutcome::Skipped(_) => {
                    run.summary.skipped += 1;
                    run.summary.cancelled = true;
                    continue;
                }
            }

            let finished = run.summary.finished();
            if self.config.progress_interval > 0 && finished % self.config.progress_interval == 0 {
                tracing::info!(
                    processed = run.summary.processed,
                    errors = run.summary.errors,
                    total = run.summary.total,
                    "full recompute progress"
                );
            }
        }
    }

    // The shutdown check runs on first poll, which is when buffer_unordered
    // admits the subject into its window.
    async fn process_subject(
        &self,
        subject_id: SubjectId,
        shutdown: &watch::Receiver<bool>,
    ) -> SubjectOutcome {
        if *shutdown.borrow() {
            return SubjectOutcome::Skipped(subject_id);
        }
        match self.pipeline.run(&subject_id).await {
            Ok(recomputed) => SubjectOutcome::Processed(subject_id, recomputed),
            Err(e) => SubjectOutcome::Failed(subject_id, e),
        }
    }
}
