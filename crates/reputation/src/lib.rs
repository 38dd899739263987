//! Reputation maintenance for reviewed users.
//!
//! This crate turns a subject's live reviews into an aggregate reputation
//! and keeps every copy of it in sync:
//! - ReviewFilter deciding which reviews count
//! - Aggregator and Propagator for one subject's recompute and fan-out
//! - EventIngress reacting to single review mutations
//! - BatchCoordinator recomputing every active subject
//! - StatsQuery for read-only per-subject statistics

pub mod aggregator;
pub mod batch;
pub mod config;
pub mod error;
pub mod filter;
pub mod ingress;
pub mod pipeline;
pub mod propagator;
pub mod stats;

#[cfg(test)]
mod testing;

pub use aggregator::{Aggregator, Reputation, round2};
pub use batch::{BatchCoordinator, BatchRun, BatchSummary, SubjectOutcome};
pub use config::ReputationConfig;
pub use error::{ReputationError, Result};
pub use filter::{MAX_SCORE, MIN_SCORE, ReviewFilter};
pub use ingress::{EventIngress, IgnoreReason, IngressOutcome, ReviewChange, ReviewSnapshot};
pub use pipeline::{RecomputePipeline, Recomputed};
pub use propagator::{PropagationReport, Propagator};
pub use stats::{RECENT_LIMIT, ReviewSummary, ScoreHistogram, StatsQuery, SubjectStatistics};
