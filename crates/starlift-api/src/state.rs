//! # Application State
//!
//! Shared state for the Axum application: the coordinator's component
//! graph, wired once at startup and cloned cheaply into every handler via
//! the `State` extractor.

use std::sync::Arc;
use std::time::Duration;

use starlift_fanout::SubscriptionManager;
use starlift_gateway::Gateway;
use starlift_journal::{JournalConfig, TransactionJournal};
use starlift_orchestrator::{OrchestratorConfig, TransferOrchestrator};
use starlift_registry::{InstanceDirectory, TreeBuilder};
use starlift_store::{ExportStore, StoreConfig};

use crate::config::CoordinatorConfig;
use crate::middleware::metrics::ApiMetrics;

/// Shared application state passed to all route and socket handlers.
#[derive(Clone)]
pub struct AppState {
    /// Resolved configuration.
    pub config: Arc<CoordinatorConfig>,
    /// Instance transport.
    pub gateway: Arc<Gateway>,
    /// Instance roster.
    pub directory: Arc<InstanceDirectory>,
    /// Platform tree builder.
    pub tree: Arc<TreeBuilder>,
    /// Export store.
    pub store: Arc<ExportStore>,
    /// Transaction journal.
    pub journal: Arc<TransactionJournal>,
    /// Subscription fan-out.
    pub fanout: Arc<SubscriptionManager>,
    /// The transfer saga driver.
    pub orchestrator: Arc<TransferOrchestrator>,
    /// Prometheus metrics.
    pub metrics: ApiMetrics,
}

impl AppState {
    /// Wire the full component graph. Must be called within a tokio
    /// runtime (persistence writer tasks are spawned here); loads any
    /// persisted exports and transaction logs from the data directory.
    pub fn new(config: CoordinatorConfig) -> Self {
        let gateway = Arc::new(Gateway::new());
        let directory = Arc::new(InstanceDirectory::new());
        let tree = Arc::new(TreeBuilder::new(directory.clone(), gateway.clone()));
        let fanout = SubscriptionManager::with_window(config.tree_broadcast_window);

        let mut store_config = StoreConfig::new(&config.data_dir);
        store_config.max_exports = config.max_exports;
        let store = ExportStore::open(store_config);

        let journal =
            TransactionJournal::open(JournalConfig::new(&config.data_dir), fanout.clone());

        let orchestrator = TransferOrchestrator::new(
            gateway.clone(),
            directory.clone(),
            tree.clone(),
            store.clone(),
            journal.clone(),
            fanout.clone(),
            OrchestratorConfig {
                validation_timeout: config.validation_timeout,
                export_store_timeout: config.export_store_timeout,
                export_poll_interval: Duration::from_millis(100),
                max_active_transfers: config.max_active_transfers,
            },
        );

        Self {
            config: Arc::new(config),
            gateway,
            directory,
            tree,
            store,
            journal,
            fanout,
            orchestrator,
            metrics: ApiMetrics::new(),
        }
    }

    /// Final durable flush, used on graceful shutdown.
    pub async fn shutdown_flush(&self) {
        self.store.flush_and_wait().await;
        self.journal.flush_and_wait().await;
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("port", &self.config.port)
            .field("exports", &self.store.len())
            .field("active_transfers", &self.orchestrator.active_len())
            .finish()
    }
}
