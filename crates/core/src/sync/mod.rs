//! Batch synchronization dispatcher
//!
//! Partitions an incoming product list into fixed-size batches and fans
//! them out to a bounded pool of worker tasks, each invoking the pricing
//! provider once per batch. Per-batch failures are data, not errors: a
//! failed batch contributes its original inputs to the `failed` set and
//! the run continues.

pub mod ports;

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use pricesync_domain::{
    BasePrice, BatchOutcome, CancelMode, PriceRequest, SyncOutcome, WorkerConfig,
};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::sync::ports::PricingProvider;

/// Batch synchronization service
///
/// Holds the configured worker-pool defaults and the shared provider
/// client. One instance serves the whole process; every worker spawned
/// by a run shares the same provider (and therefore the same circuit
/// breaker).
pub struct SyncService {
    cfg: WorkerConfig,
    provider: Arc<dyn PricingProvider>,
}

impl SyncService {
    /// Create a new service with the given worker configuration
    pub fn new(cfg: WorkerConfig, provider: Arc<dyn PricingProvider>) -> Self {
        Self { cfg, provider }
    }

    /// Synchronize a product list using the configured defaults
    pub async fn get_data(
        &self,
        subdivision_id: &str,
        calculation_time: DateTime<Utc>,
        products: Vec<BasePrice>,
        cancel: &CancellationToken,
    ) -> SyncOutcome {
        self.get_data_with_limits(
            subdivision_id,
            calculation_time,
            products,
            self.cfg.max_workers,
            self.cfg.batch_size,
            cancel,
        )
        .await
    }

    /// Synchronize a product list with explicit worker/batch limits
    ///
    /// Returns once every claimed batch has reported. Cancellation stops
    /// the claiming of new batches; whether in-flight batches finish or
    /// abort is governed by the configured [`CancelMode`]. Batches left
    /// unclaimed at cancellation are drained into `failed` so every
    /// input product ends up in exactly one of the two result sets.
    #[instrument(skip_all, fields(subdivision_id = %subdivision_id, products = products.len()))]
    pub async fn get_data_with_limits(
        &self,
        subdivision_id: &str,
        calculation_time: DateTime<Utc>,
        products: Vec<BasePrice>,
        max_workers: i64,
        batch_size: i64,
        cancel: &CancellationToken,
    ) -> SyncOutcome {
        let chunks = partition(products, batch_size);
        let total_chunks = chunks.len();
        if total_chunks == 0 {
            return SyncOutcome::default();
        }

        let workers = usize::try_from(max_workers.max(1)).unwrap_or(1);
        let run_id = Uuid::new_v4();
        info!(%run_id, chunks = total_chunks, workers, "starting batch synchronization");

        let queue = Arc::new(Mutex::new(chunks));
        // Sized to the chunk count so workers never block on a full channel.
        let (tx, mut rx) = mpsc::channel::<BatchOutcome>(total_chunks);

        let mut pool = JoinSet::new();
        for worker in 0..workers {
            pool.spawn(worker_loop(
                worker,
                Arc::clone(&self.provider),
                Arc::clone(&queue),
                tx.clone(),
                subdivision_id.to_string(),
                calculation_time,
                cancel.clone(),
                call_token(self.cfg.cancel_mode, cancel),
            ));
        }
        drop(tx);

        let mut outcome = SyncOutcome::default();
        while let Some(batch) = rx.recv().await {
            match batch {
                BatchOutcome::Resolved(items) => outcome.processed.extend(items),
                BatchOutcome::Failed { products, cause } => {
                    warn!(%run_id, batch = products.len(), %cause, "batch failed");
                    outcome.failed.extend(products);
                }
            }
        }
        while pool.join_next().await.is_some() {}

        // Chunks nobody claimed before cancellation still belong to the
        // caller; account for them as failed instead of dropping them.
        if cancel.is_cancelled() {
            let mut queue = queue.lock();
            while let Some(chunk) = queue.pop_front() {
                outcome.failed.extend(chunk);
            }
        }

        info!(
            %run_id,
            processed = outcome.processed.len(),
            failed = outcome.failed.len(),
            "batch synchronization finished"
        );
        outcome
    }
}

/// The token handed to in-flight provider calls
///
/// `FinishInFlight` detaches the call from the caller's token so work
/// already running completes and still contributes its result;
/// `AbortInFlight` propagates the caller's token into the call.
fn call_token(mode: CancelMode, cancel: &CancellationToken) -> CancellationToken {
    match mode {
        CancelMode::FinishInFlight => CancellationToken::new(),
        CancelMode::AbortInFlight => cancel.clone(),
    }
}

#[allow(clippy::too_many_arguments)]
async fn worker_loop(
    worker: usize,
    provider: Arc<dyn PricingProvider>,
    queue: Arc<Mutex<VecDeque<Vec<BasePrice>>>>,
    tx: mpsc::Sender<BatchOutcome>,
    subdivision_id: String,
    calculation_time: DateTime<Utc>,
    cancel: CancellationToken,
    call_cancel: CancellationToken,
) {
    loop {
        if cancel.is_cancelled() {
            debug!(worker, "cancellation observed, no further chunks claimed");
            break;
        }

        let Some(products) = queue.lock().pop_front() else {
            break;
        };

        let request = PriceRequest {
            subdivision_id: subdivision_id.clone(),
            calculation_time,
            products,
        };
        debug!(worker, batch = request.products.len(), "processing chunk");

        let outcome = match provider.get_final_price_info(&request, &call_cancel).await {
            Ok(items) => BatchOutcome::Resolved(items),
            Err(cause) => BatchOutcome::Failed { products: request.products, cause },
        };

        if tx.send(outcome).await.is_err() {
            break;
        }
    }
}

/// Partition a product list into consecutive chunks of `batch_size`
///
/// The last chunk may be smaller; a non-positive `batch_size` yields the
/// whole list as a single chunk. Chunk order follows input order.
fn partition(products: Vec<BasePrice>, batch_size: i64) -> VecDeque<Vec<BasePrice>> {
    if products.is_empty() {
        return VecDeque::new();
    }
    if batch_size <= 0 {
        return VecDeque::from([products]);
    }

    let size = batch_size as usize;
    let mut chunks = VecDeque::with_capacity(products.len().div_ceil(size));
    let mut items = products.into_iter();
    loop {
        let chunk: Vec<BasePrice> = items.by_ref().take(size).collect();
        if chunk.is_empty() {
            break;
        }
        chunks.push_back(chunk);
    }
    chunks
}
