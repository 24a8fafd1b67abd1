//! Port interfaces for the pricing provider

use async_trait::async_trait;
use pricesync_domain::{
    ExportPollStatus, PriceRequest, PricedProduct, PromotionsPayload, Result,
};
use tokio_util::sync::CancellationToken;

/// Trait for synchronous price calculation against the provider
#[async_trait]
pub trait PricingProvider: Send + Sync {
    /// Calculate final prices for one batch of products
    ///
    /// Returned item order matches the provider response; items the
    /// provider returned without a product identifier are already
    /// dropped by the implementation.
    async fn get_final_price_info(
        &self,
        request: &PriceRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<PricedProduct>>;
}

/// Trait for the provider's asynchronous bulk-export operations
#[async_trait]
pub trait ExportProvider: Send + Sync {
    /// Submit an export job, returning its export id
    async fn submit_export(&self, operation: &str, cancel: &CancellationToken) -> Result<String>;

    /// Poll a previously submitted export job
    async fn poll_export(
        &self,
        operation: &str,
        export_id: &str,
        cancel: &CancellationToken,
    ) -> Result<ExportPollStatus>;

    /// Download and decode a finished export file
    async fn fetch_export_file(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<PromotionsPayload>;
}
