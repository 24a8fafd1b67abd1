//! Shared application state

use std::sync::Arc;

use pricesync_core::{PromotionService, SyncService};
use pricesync_domain::WorkerConfig;
use tokio::sync::Semaphore;

/// State shared by every request handler
#[derive(Clone)]
pub struct AppState {
    /// Batch synchronization service
    pub sync: Arc<SyncService>,
    /// Promotion export service
    pub promotions: Arc<PromotionService>,
    /// Worker-pool defaults applied when the request carries no override
    pub defaults: WorkerConfig,
    /// Single-permit gate: the process synchronizes one request at a
    /// time end-to-end
    pub gate: Arc<Semaphore>,
}

impl AppState {
    /// Wire up the handler state
    pub fn new(
        sync: Arc<SyncService>,
        promotions: Arc<PromotionService>,
        defaults: WorkerConfig,
    ) -> Self {
        Self { sync, promotions, defaults, gate: Arc::new(Semaphore::new(1)) }
    }
}
