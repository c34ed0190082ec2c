use crate::infra::AppState;
use crate::preview::{preview_statements, PreviewSummary, PreviewUnit};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::io::Cursor;
use std::sync::Arc;
use upkyp::error::AppError;
use upkyp::workflows::billing::domain::{BillingPeriod, Property};
use upkyp::workflows::billing::ledger::{
    billing_router, BillingLedgerService, BillingRepository, NotificationPublisher,
};
use upkyp::workflows::meter_readings::MeterReadingImporter;

#[derive(Debug, Deserialize)]
pub(crate) struct PreviewRequest {
    pub(crate) property: Property,
    pub(crate) period: BillingPeriod,
    #[serde(default)]
    pub(crate) as_of: Option<NaiveDate>,
    #[serde(default)]
    pub(crate) units: Vec<PreviewUnit>,
    #[serde(default)]
    pub(crate) readings_csv: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct PreviewResponse {
    pub(crate) currency: String,
    pub(crate) data_source: PreviewDataSource,
    #[serde(flatten)]
    pub(crate) summary: PreviewSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum PreviewDataSource {
    ReadingsCsv,
    Request,
}

pub(crate) fn with_billing_routes<R, N>(service: Arc<BillingLedgerService<R, N>>) -> axum::Router
where
    R: BillingRepository + 'static,
    N: NotificationPublisher + 'static,
{
    billing_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/billing/preview",
            axum::routing::post(billing_preview_endpoint),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Price units without touching the ledger. CSV rows are appended after any inline units.
pub(crate) async fn billing_preview_endpoint(
    Extension(state): Extension<AppState>,
    Json(payload): Json<PreviewRequest>,
) -> Result<Json<PreviewResponse>, AppError> {
    let PreviewRequest {
        property,
        period,
        as_of,
        mut units,
        readings_csv,
    } = payload;

    let data_source = if let Some(csv) = readings_csv {
        let reader = Cursor::new(csv.into_bytes());
        let rows = MeterReadingImporter::from_reader(reader)?;
        units.extend(rows.into_iter().map(PreviewUnit::from));
        PreviewDataSource::ReadingsCsv
    } else {
        PreviewDataSource::Request
    };

    let as_of = as_of.unwrap_or_else(|| Local::now().date_naive());
    let summary = preview_statements(&property, units, period, as_of)?;

    Ok(Json(PreviewResponse {
        currency: state.billing.currency.clone(),
        data_source,
        summary,
    }))
}
