//! Promotion export workflow
//!
//! Drives the provider's asynchronous bulk-export sequence: submit an
//! export job, poll it on a fixed interval until it is ready or a
//! wall-clock deadline passes, then fetch and decode the result file.
//! The whole sequence occupies the calling task; there is no background
//! work.

use std::borrow::Cow;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use pricesync_domain::{ExportPollStatus, ExportedPromotion, PromotionRecord, SyncError};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::sync::ports::ExportProvider;

/// Export operation tag for the active-promotions extract
pub const DEFAULT_EXPORT_OPERATION: &str = "EksportDejstvuyushhiePromoakcii";

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);
const DEFAULT_POLL_DEADLINE: Duration = Duration::from_secs(60);

/// Terminal outcomes of one export workflow run
///
/// Submit, poll and fetch failures stay distinct so callers can branch
/// on where the sequence broke off.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Submitting the export job failed
    #[error("export submit failed: {0}")]
    Submit(#[source] SyncError),

    /// A poll call failed while waiting for the job
    #[error("export poll failed: {0}")]
    Poll(#[source] SyncError),

    /// Downloading or decoding the result file failed
    #[error("export file fetch failed: {0}")]
    Fetch(#[source] SyncError),

    /// The job never became ready before the deadline
    #[error("export not ready after {deadline:?}")]
    TimedOut { deadline: Duration },

    /// The caller cancelled the workflow
    #[error("export cancelled")]
    Cancelled,
}

/// Service retrieving the full list of active promotions
pub struct PromotionService {
    provider: Arc<dyn ExportProvider>,
    operation: String,
    poll_interval: Duration,
    poll_deadline: Duration,
}

impl PromotionService {
    /// Create a service with default operation tag and poll timing
    pub fn new(provider: Arc<dyn ExportProvider>) -> Self {
        Self::with_timing(
            provider,
            DEFAULT_EXPORT_OPERATION,
            DEFAULT_POLL_INTERVAL,
            DEFAULT_POLL_DEADLINE,
        )
    }

    /// Create a service with explicit operation tag and poll timing
    pub fn with_timing(
        provider: Arc<dyn ExportProvider>,
        operation: impl Into<String>,
        poll_interval: Duration,
        poll_deadline: Duration,
    ) -> Self {
        Self { provider, operation: operation.into(), poll_interval, poll_deadline }
    }

    /// Run the full submit → poll → fetch sequence
    #[instrument(skip_all, fields(operation = %self.operation))]
    pub async fn get_promotions(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<PromotionRecord>, ExportError> {
        let export_id =
            self.provider.submit_export(&self.operation, cancel).await.map_err(ExportError::Submit)?;
        if export_id.is_empty() {
            warn!(operation = %self.operation, "empty export id in reply");
            return Err(ExportError::Submit(SyncError::Validation("empty export id".into())));
        }
        debug!(%export_id, "export submitted");

        let file_url = self.await_export_file(&export_id, cancel).await?;

        let payload = self
            .provider
            .fetch_export_file(&file_url, cancel)
            .await
            .map_err(ExportError::Fetch)?;

        let records: Vec<PromotionRecord> =
            payload.promotions.into_iter().map(promotion_record).collect();
        info!(promotions = records.len(), "export finished");
        Ok(records)
    }

    /// Poll until the export file URL is available
    ///
    /// The deadline is checked after each not-ready reply, before the
    /// interval sleep; the sleep itself races the cancellation token.
    async fn await_export_file(
        &self,
        export_id: &str,
        cancel: &CancellationToken,
    ) -> Result<String, ExportError> {
        let started = Instant::now();

        loop {
            if cancel.is_cancelled() {
                return Err(ExportError::Cancelled);
            }

            let status = self
                .provider
                .poll_export(&self.operation, export_id, cancel)
                .await
                .map_err(ExportError::Poll)?;

            match status {
                ExportPollStatus::Ready { file_url } => return Ok(file_url),
                ExportPollStatus::Pending => {
                    if started.elapsed() > self.poll_deadline {
                        return Err(ExportError::TimedOut { deadline: self.poll_deadline });
                    }
                    debug!(%export_id, "export not ready, waiting");
                    tokio::select! {
                        () = cancel.cancelled() => return Err(ExportError::Cancelled),
                        () = tokio::time::sleep(self.poll_interval) => {}
                    }
                }
            }
        }
    }
}

/// Convert a raw export record into a domain promotion record
fn promotion_record(promo: ExportedPromotion) -> PromotionRecord {
    PromotionRecord {
        external_id: promo.external_id,
        name: promo.name,
        schema_id: promo.schema_id,
        start_date: promo.start_date_time_utc.as_deref().and_then(parse_utc_timestamp),
        end_date: promo.end_date_time_utc.as_deref().and_then(parse_utc_timestamp),
    }
}

/// Parse a provider timestamp into an absolute instant
///
/// Provider timestamps frequently omit the timezone marker; a "Z"
/// suffix is appended before RFC3339 parsing in that case. An
/// unparseable value degrades to `None` rather than failing the record.
pub fn parse_utc_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if raw.is_empty() {
        return None;
    }

    let normalized: Cow<'_, str> =
        if has_timezone_marker(raw) { Cow::Borrowed(raw) } else { Cow::Owned(format!("{raw}Z")) };

    match DateTime::parse_from_rfc3339(&normalized) {
        Ok(parsed) => Some(parsed.with_timezone(&Utc)),
        Err(err) => {
            warn!(%err, src = raw, "failed to parse provider timestamp");
            None
        }
    }
}

/// Whether the time portion of the string carries a timezone marker
fn has_timezone_marker(raw: &str) -> bool {
    if raw.ends_with('Z') {
        return true;
    }
    // Only look after the date/time separator so date dashes don't count.
    raw.rsplit('T').next().is_some_and(|time| time.contains('+') || time.contains('-'))
}
