//! Mindbox API client with circuit breaker and retry logic
//!
//! Implements the core provider ports against the Mindbox HTTP API.
//! Every base-API call runs through one shared circuit breaker; the
//! underlying transport handles per-send retries. Export files are
//! downloaded from a provider-issued absolute URL with a dedicated
//! short-lived transport, outside the base endpoint's breaker.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pricesync_common::resilience::{CircuitBreaker, CircuitBreakerConfig, ResilienceError};
use pricesync_core::sync::ports::{ExportProvider, PricingProvider};
use pricesync_domain::{
    ExportPollStatus, PriceRequest, PricedProduct, PromotionsPayload, ProviderConfig, Result,
    SyncError,
};
use reqwest::Method;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::http::HttpClient;
use crate::mindbox::wire;

const PATH_OPERATIONS_SYNC: &str = "operations/sync";
const OPERATION_GET_PRODUCT_INFO: &str = "Shop.GetProductInfo";
const ENDPOINT_ID: &str = "MECHTA";

const STATUS_SUCCESS: &str = "Success";
const PROCESSING_STATUS_CALCULATED: &str = "Calculated";
const PROCESSING_STATUS_READY: &str = "Ready";

const EXPORT_FETCH_TIMEOUT: Duration = Duration::from_secs(20);
const EXPORT_FETCH_RETRIES: usize = 1;
const EXPORT_FETCH_BACKOFF: Duration = Duration::from_secs(5);

/// Mindbox API client
///
/// One instance serves the whole process; the circuit breaker inside it
/// is the single piece of state shared across dispatcher workers.
pub struct MindboxClient {
    http: HttpClient,
    breaker: Arc<CircuitBreaker>,
    base_url: String,
    secret_key: String,
}

impl MindboxClient {
    /// Create a client from provider configuration
    pub fn new(cfg: &ProviderConfig) -> Result<Self> {
        if cfg.base_url.is_empty() {
            return Err(SyncError::Config("mindbox client without base URL".into()));
        }
        let parsed = Url::parse(&cfg.base_url)
            .map_err(|err| SyncError::Config(format!("invalid base URL: {err}")))?;

        let http = HttpClient::builder()
            .timeout(cfg.timeout)
            .max_attempts(cfg.retry_count + 1)
            .base_backoff(cfg.retry_interval)
            .build()?;

        let breaker_config = CircuitBreakerConfig::builder()
            .max_failures(cfg.breaker_max_failures)
            .reset_timeout(cfg.breaker_reset_timeout)
            .build()
            .map_err(|err| SyncError::Config(err.to_string()))?;
        let breaker = CircuitBreaker::new(breaker_config)
            .map_err(|err| SyncError::Config(err.to_string()))?;

        Ok(Self {
            http,
            breaker: Arc::new(breaker),
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            secret_key: cfg.secret_key.clone(),
        })
    }

    /// The shared circuit breaker guarding the base endpoint
    pub fn breaker(&self) -> Arc<CircuitBreaker> {
        Arc::clone(&self.breaker)
    }

    fn operations_url(&self) -> String {
        format!("{}/{}", self.base_url, PATH_OPERATIONS_SYNC)
    }

    fn auth_header(&self) -> String {
        format!("Mindbox secretKey=\"{}\"", self.secret_key)
    }

    /// Run one breaker-protected call: send, check status, decode
    ///
    /// Transport errors, non-2xx statuses and decode failures all count
    /// against the breaker; provider-level validation happens outside.
    async fn execute<T: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
        cancel: &CancellationToken,
    ) -> Result<T> {
        let result = self
            .breaker
            .execute(|| async move {
                let response = self.http.send(builder, cancel).await?;
                let code = response.status().as_u16();
                if !(200..300).contains(&code) {
                    let body = response.text().await.unwrap_or_default();
                    return Err(SyncError::Status { code, body });
                }
                response.json::<T>().await.map_err(|err| SyncError::Decode(err.to_string()))
            })
            .await;

        result.map_err(|err| match err {
            ResilienceError::CircuitOpen => SyncError::CircuitOpen,
            ResilienceError::OperationFailed { source } => source,
        })
    }

    /// Calculate final prices for one batch of products
    #[instrument(skip_all, fields(batch = request.products.len()))]
    pub async fn get_final_price_info(
        &self,
        request: &PriceRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<PricedProduct>> {
        let body = wire::ProductInfoRequest::encode(request);
        let builder = self
            .http
            .request(Method::POST, self.operations_url())
            .query(&[("operation", OPERATION_GET_PRODUCT_INFO), ("endpointId", ENDPOINT_ID)])
            .header("Authorization", self.auth_header())
            .json(&body);

        let reply: wire::ProductInfoResponse = self.execute(builder, cancel).await?;

        if reply.status != STATUS_SUCCESS {
            return Err(SyncError::Validation(format!("bad status: {}", reply.status)));
        }
        if reply.product_list.processing_status != PROCESSING_STATUS_CALCULATED {
            return Err(SyncError::Validation(format!(
                "bad processing status in reply: {}",
                reply.product_list.processing_status
            )));
        }

        let items = reply
            .product_list
            .items
            .into_iter()
            .filter(|item| !item.product.ids.mechtakz.is_empty())
            .map(wire::ResponseItem::decode)
            .collect();
        Ok(items)
    }

    /// Send one export request: without an id to submit, with one to poll
    async fn send_export_request(
        &self,
        operation: &str,
        export_id: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<wire::ExportResponse> {
        let body = wire::ExportRequest { export_id: export_id.map(str::to_string) };
        let builder = self
            .http
            .request(Method::POST, self.operations_url())
            .query(&[("operation", operation)])
            .header("Authorization", self.auth_header())
            .json(&body);

        self.execute(builder, cancel).await
    }
}

#[async_trait]
impl PricingProvider for MindboxClient {
    async fn get_final_price_info(
        &self,
        request: &PriceRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<PricedProduct>> {
        Self::get_final_price_info(self, request, cancel).await
    }
}

#[async_trait]
impl ExportProvider for MindboxClient {
    #[instrument(skip_all, fields(operation = %operation))]
    async fn submit_export(&self, operation: &str, cancel: &CancellationToken) -> Result<String> {
        let reply = self.send_export_request(operation, None, cancel).await?;
        if reply.export_id.is_empty() {
            warn!(operation, "empty export id in reply");
            return Err(SyncError::Validation("empty export id in reply".into()));
        }
        Ok(reply.export_id)
    }

    #[instrument(skip_all, fields(operation = %operation, export_id = %export_id))]
    async fn poll_export(
        &self,
        operation: &str,
        export_id: &str,
        cancel: &CancellationToken,
    ) -> Result<ExportPollStatus> {
        let reply = self.send_export_request(operation, Some(export_id), cancel).await?;

        if reply.export_result.processing_status != PROCESSING_STATUS_READY {
            debug!(
                status = %reply.export_result.processing_status,
                "export not ready"
            );
            return Ok(ExportPollStatus::Pending);
        }

        match reply.export_result.urls.into_iter().next() {
            Some(file_url) => Ok(ExportPollStatus::Ready { file_url }),
            None => {
                warn!(operation, export_id, "empty export-file url on ready status");
                Err(SyncError::Validation("empty export-file url on ready status".into()))
            }
        }
    }

    async fn fetch_export_file(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<PromotionsPayload> {
        let file: wire::PromotionsFileResponse = fetch_json(url, cancel).await?;
        Ok(file.decode())
    }
}

/// Download and decode a JSON document from an absolute URL
///
/// Export files live on a provider-issued URL distinct from the base
/// API, so this takes only connection parameters and builds a one-off
/// transport with a short timeout and a single retry.
async fn fetch_json<T: DeserializeOwned>(url: &str, cancel: &CancellationToken) -> Result<T> {
    let http = HttpClient::builder()
        .timeout(EXPORT_FETCH_TIMEOUT)
        .max_attempts(EXPORT_FETCH_RETRIES + 1)
        .base_backoff(EXPORT_FETCH_BACKOFF)
        .build()?;

    let response = http.send(http.request(Method::GET, url), cancel).await?;
    let code = response.status().as_u16();
    if !(200..300).contains(&code) {
        let body = response.text().await.unwrap_or_default();
        return Err(SyncError::Status { code, body });
    }

    response.json::<T>().await.map_err(|err| SyncError::Decode(err.to_string()))
}
