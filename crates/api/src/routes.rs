//! HTTP router and request handlers
//!
//! Thin adapters: parse the inbound payload, call into the core
//! services, and mirror their output as JSON. Both data handlers share
//! a single-permit semaphore so only one synchronization runs at a
//! time.

use std::time::Instant;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use chrono::{SecondsFormat, Utc};
use pricesync_domain::{BasePrice, PricedProduct, PromotionRecord};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::state::AppState;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/data/{id}", post(get_data))
        .route("/promotions", get(get_promotions))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct GetDataRequest {
    items: Vec<ItemDto>,
    max_workers: Option<i64>,
    batch_size: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ItemDto {
    product_id: String,
    price: f64,
}

#[derive(Debug, Serialize)]
struct GetDataResponse {
    id: String,
    total_processed: usize,
    total_failed: usize,
    process_duration: String,
    processed: Vec<PricedProduct>,
    failed: Vec<BasePrice>,
}

#[derive(Debug, Serialize)]
struct PromotionDto {
    external_id: String,
    name: String,
    schema_id: String,
    start_date: Option<String>,
    end_date: Option<String>,
}

#[derive(Debug, Serialize)]
struct GetPromotionsResponse {
    total_promotions: usize,
    process_duration: String,
    promotions: Vec<PromotionDto>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(ErrorResponse { error: message.to_string() })).into_response()
}

async fn index() -> Response {
    Json(json!({
        "api": [
            {
                "endpoint": "/data/{id}",
                "body": "{items: [{product_id: string, price: number}]}"
            },
            {"endpoint": "/promotions"}
        ]
    }))
    .into_response()
}

async fn health() -> Response {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
    .into_response()
}

async fn get_data(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<GetDataRequest>,
) -> Response {
    let Ok(_permit) = state.gate.acquire().await else {
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "service shutting down");
    };

    let started = Instant::now();
    let products: Vec<BasePrice> = request
        .items
        .into_iter()
        .map(|item| BasePrice { product_id: item.product_id, price: item.price })
        .collect();

    let cancel = CancellationToken::new();
    let outcome = state
        .sync
        .get_data_with_limits(
            &id,
            Utc::now(),
            products,
            request.max_workers.unwrap_or(state.defaults.max_workers),
            request.batch_size.unwrap_or(state.defaults.batch_size),
            &cancel,
        )
        .await;

    Json(GetDataResponse {
        id,
        total_processed: outcome.processed.len(),
        total_failed: outcome.failed.len(),
        process_duration: format!("{:?}", started.elapsed()),
        processed: outcome.processed,
        failed: outcome.failed,
    })
    .into_response()
}

async fn get_promotions(State(state): State<AppState>) -> Response {
    let Ok(_permit) = state.gate.acquire().await else {
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "service shutting down");
    };

    let started = Instant::now();
    let cancel = CancellationToken::new();

    match state.promotions.get_promotions(&cancel).await {
        Ok(records) => {
            let promotions: Vec<PromotionDto> = records.into_iter().map(promotion_dto).collect();
            Json(GetPromotionsResponse {
                total_promotions: promotions.len(),
                process_duration: format!("{:?}", started.elapsed()),
                promotions,
            })
            .into_response()
        }
        Err(err) => {
            warn!(error = %err, "promotion export failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "cannot access promotions data")
        }
    }
}

fn promotion_dto(record: PromotionRecord) -> PromotionDto {
    PromotionDto {
        external_id: record.external_id,
        name: record.name,
        schema_id: record.schema_id,
        start_date: record
            .start_date
            .map(|date| date.to_rfc3339_opts(SecondsFormat::Secs, true)),
        end_date: record.end_date.map(|date| date.to_rfc3339_opts(SecondsFormat::Secs, true)),
    }
}
