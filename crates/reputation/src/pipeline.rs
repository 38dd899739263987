//! Aggregator followed by Propagator for one subject, under a time budget.

use std::time::Duration;

use common::SubjectId;
use doc_store::DocumentStore;

use crate::aggregator::{Aggregator, Reputation};
use crate::config::ReputationConfig;
use crate::propagator::{PropagationReport, Propagator};
use crate::{ReputationError, Result};

/// Result of recomputing and propagating one subject.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Recomputed {
    pub reputation: Reputation,
    pub report: PropagationReport,
}

/// Recomputes a subject and propagates the result.
///
/// Both write entry points go through here. Dropping the future on timeout
/// never leaves a fan-out batch half applied, because each batch commit is
/// atomic at the store.
#[derive(Clone)]
pub struct RecomputePipeline<S: DocumentStore> {
    aggregator: Aggregator<S>,
    propagator: Propagator<S>,
    call_timeout: Duration,
}

impl<S: DocumentStore + Clone> RecomputePipeline<S> {
    pub fn new(store: S, config: &ReputationConfig) -> Self {
        Self {
            aggregator: Aggregator::new(store.clone()),
            propagator: Propagator::new(store).with_fanout_batch_size(config.fanout_batch_size),
            call_timeout: config.call_timeout,
        }
    }
}

impl<S: DocumentStore> RecomputePipeline<S> {
    pub fn aggregator(&self) -> &Aggregator<S> {
        &self.aggregator
    }

    pub fn propagator(&self) -> &Propagator<S> {
        &self.propagator
    }

    pub async fn run(&self, subject_id: &SubjectId) -> Result<Recomputed> {
        let work = async {
            let reputation = self.aggregator.recompute(subject_id).await?;
            let report = self.propagator.apply(subject_id, reputation).await?;
            Ok(Recomputed { reputation, report })
        };

        let result = tokio::time::timeout(self.call_timeout, work)
            .await
            .map_err(|_| ReputationError::Timeout(self.call_timeout))
            .and_then(|r| r);

        match &result {
            Ok(_) => metrics::counter!("reputation_recomputations_total").increment(1),
            Err(_) => metrics::counter!("reputation_recompute_failures_total").increment(1),
        }
        result
    }
}
