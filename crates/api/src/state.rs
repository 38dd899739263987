//! Shared application state.

use doc_store::DocumentStore;
use reputation::{BatchCoordinator, EventIngress, RecomputePipeline, StatsQuery};
use tokio::sync::watch;

use crate::auth::AdminTokens;
use crate::config::Config;

/// Shared application state accessible from all handlers.
pub struct AppState<S: DocumentStore> {
    pub ingress: EventIngress<S>,
    pub batch: BatchCoordinator<S>,
    pub stats: StatsQuery<S>,
    pub admin_tokens: AdminTokens,
    shutdown: watch::Sender<bool>,
}

impl<S: DocumentStore + Clone> AppState<S> {
    pub fn new(store: S, config: &Config) -> Self {
        let pipeline = RecomputePipeline::new(store.clone(), &config.reputation);
        let (shutdown, _) = watch::channel(false);
        Self {
            ingress: EventIngress::new(pipeline),
            batch: BatchCoordinator::new(store.clone(), config.reputation.clone()),
            stats: StatsQuery::new(store),
            admin_tokens: AdminTokens::new(config.admin_tokens.iter().cloned()),
            shutdown,
        }
    }
}

impl<S: DocumentStore> AppState<S> {
    /// A receiver that flips to `true` once shutdown begins.
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Stops running full recomputes from starting new subjects.
    pub fn begin_shutdown(&self) {
        self.shutdown.send_replace(true);
    }
}
