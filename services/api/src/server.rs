use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryGeocoder, InMemoryObjectStorage};
use crate::routes::with_operational_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use student_lets::config::AppConfig;
use student_lets::error::AppError;
use student_lets::marketplace::{HeaderAuthVerifier, InMemoryStore, Marketplace};
use student_lets::telemetry;
use tracing::info;

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
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let objects = Arc::new(InMemoryObjectStorage::new(&config.storage));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        objects: objects.clone(),
    };

    let marketplace = Marketplace::new(
        Arc::new(InMemoryStore::new()),
        objects,
        Arc::new(InMemoryGeocoder::new(&config.geocoding)),
        &config.leasing,
    );

    let app = with_operational_routes(marketplace.router(Arc::new(HeaderAuthVerifier)))
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        transitions = ?config.leasing.transitions,
        "student lets marketplace ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
