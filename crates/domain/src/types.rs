//! Common data types used throughout the application

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::SyncError;

/// A single product with its base catalog price
///
/// Immutable once constructed; the dispatcher groups these into batches
/// and hands ownership of each batch to exactly one worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasePrice {
    pub product_id: String,
    pub price: f64,
}

/// Price calculation request for one batch of products
#[derive(Debug, Clone)]
pub struct PriceRequest {
    pub subdivision_id: String,
    pub calculation_time: DateTime<Utc>,
    pub products: Vec<BasePrice>,
}

/// Final calculated price for one product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalPrice {
    pub product_id: String,
    pub price: f64,
}

/// A promotion the provider applied while calculating a price
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppliedPromo {
    pub id: i64,
    pub external_id: String,
    pub kind: String,
    pub name: String,
}

/// A promo placeholder attached to a calculated price
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromoPlaceholder {
    pub placeholder_id: String,
    pub promo_id: i64,
    pub kind: String,
    pub message: String,
}

/// One fully priced product as returned by the provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricedProduct {
    pub final_price: FinalPrice,
    pub promotions: Vec<AppliedPromo>,
    pub placeholders: Vec<PromoPlaceholder>,
}

/// Result of processing one batch
///
/// Exactly one variant is produced per batch: either every item priced,
/// or the original inputs together with the error that failed them.
#[derive(Debug)]
pub enum BatchOutcome {
    /// The provider priced the whole batch
    Resolved(Vec<PricedProduct>),
    /// The batch failed; the original inputs are preserved for the caller
    Failed {
        products: Vec<BasePrice>,
        cause: SyncError,
    },
}

/// Aggregated result of one synchronization run
///
/// Both collections are order-independent; callers must not rely on
/// positional correspondence to the input list.
#[derive(Debug, Default)]
pub struct SyncOutcome {
    pub processed: Vec<PricedProduct>,
    pub failed: Vec<BasePrice>,
}

/// An active promotion retrieved through the export workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromotionRecord {
    pub external_id: String,
    pub name: String,
    pub schema_id: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

/// Raw promotion record as decoded from the export file
///
/// Timestamp fields are kept as provider strings; the export workflow
/// normalizes them into absolute instants.
#[derive(Debug, Clone)]
pub struct ExportedPromotion {
    pub external_id: String,
    pub name: String,
    pub schema_id: String,
    pub start_date_time_utc: Option<String>,
    pub end_date_time_utc: Option<String>,
}

/// Decoded contents of an export result file
#[derive(Debug, Clone, Default)]
pub struct PromotionsPayload {
    pub promotions: Vec<ExportedPromotion>,
}

/// Observable result of one export poll step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportPollStatus {
    /// The export job is still being prepared
    Pending,
    /// The export finished; the result file is available at `file_url`
    Ready { file_url: String },
}
