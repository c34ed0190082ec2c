use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use serde_json::json;

use super::super::domain::UnitId;
use super::record::{BillingId, BillingStatementView, Payment};
use super::repository::{BillingRepository, NotificationPublisher, RepositoryError};
use super::service::{BillingLedgerService, BillingServiceError, IssueBillingRequest};

/// Router builder exposing the billing ledger over HTTP.
pub fn billing_router<R, N>(service: Arc<BillingLedgerService<R, N>>) -> Router
where
    R: BillingRepository + 'static,
    N: NotificationPublisher + 'static,
{
    Router::new()
        .route("/api/v1/billing", post(issue_handler::<R, N>))
        .route(
            "/api/v1/billing/:billing_id",
            get(statement_handler::<R, N>),
        )
        .route(
            "/api/v1/billing/:billing_id/payments",
            post(payment_handler::<R, N>),
        )
        .route(
            "/api/v1/units/:unit_id/billing",
            get(history_handler::<R, N>),
        )
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AsOfQuery {
    #[serde(default)]
    pub(crate) as_of: Option<NaiveDate>,
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub(crate) async fn issue_handler<R, N>(
    State(service): State<Arc<BillingLedgerService<R, N>>>,
    axum::Json(request): axum::Json<IssueBillingRequest>,
) -> Response
where
    R: BillingRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let today = today();
    match service
        .issue(request, today)
        .and_then(|record| Ok(record.view(today)?))
    {
        Ok(view) => (StatusCode::CREATED, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn statement_handler<R, N>(
    State(service): State<Arc<BillingLedgerService<R, N>>>,
    Path(billing_id): Path<String>,
    Query(query): Query<AsOfQuery>,
) -> Response
where
    R: BillingRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let as_of = query.as_of.unwrap_or_else(today);
    match service.statement_as_of(&BillingId(billing_id), as_of) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn payment_handler<R, N>(
    State(service): State<Arc<BillingLedgerService<R, N>>>,
    Path(billing_id): Path<String>,
    axum::Json(payment): axum::Json<Payment>,
) -> Response
where
    R: BillingRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let id = BillingId(billing_id);
    let as_of = today().max(payment.paid_on);
    match service
        .record_payment(&id, payment)
        .and_then(|record| Ok(record.view(as_of)?))
    {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn history_handler<R, N>(
    State(service): State<Arc<BillingLedgerService<R, N>>>,
    Path(unit_id): Path<String>,
    Query(query): Query<AsOfQuery>,
) -> Response
where
    R: BillingRepository + 'static,
    N: NotificationPublisher + 'static,
{
    let as_of = query.as_of.unwrap_or_else(today);
    let views = service.history(&UnitId(unit_id)).and_then(|records| {
        records
            .iter()
            .map(|record| record.view(as_of).map_err(BillingServiceError::from))
            .collect::<Result<Vec<BillingStatementView>, _>>()
    });

    match views {
        Ok(views) => (StatusCode::OK, axum::Json(views)).into_response(),
        Err(error) => error_response(error),
    }
}

fn error_response(error: BillingServiceError) -> Response {
    let status = match &error {
        BillingServiceError::Billing(_) | BillingServiceError::Payment(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        BillingServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        BillingServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        BillingServiceError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let payload = json!({
        "error": error.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
