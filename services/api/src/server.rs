use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryBillingRepository, LogNotificationPublisher};
use crate::routes::with_billing_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;
use upkyp::config::AppConfig;
use upkyp::error::AppError;
use upkyp::telemetry;
use upkyp::workflows::billing::ledger::BillingLedgerService;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        billing: Arc::new(config.billing.clone()),
    };

    let repository = Arc::new(InMemoryBillingRepository::default());
    let notifications = Arc::new(LogNotificationPublisher);
    let ledger_service = Arc::new(BillingLedgerService::new(repository, notifications));

    let app = with_billing_routes(ledger_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        currency = %config.billing.currency,
        "billing service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
