use crate::cli::ServeArgs;
use crate::infra::{load_directory, AppState};
use crate::routes::with_marketplace_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use fabmarket::config::AppConfig;
use fabmarket::engagement::{EngagementService, InMemoryEngagementStore};
use fabmarket::error::AppError;
use fabmarket::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
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
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let directory = load_directory(config.marketplace.directory_seed.as_deref())?;
    let engagement = Arc::new(EngagementService::new(
        Arc::new(InMemoryEngagementStore::new()),
        Arc::new(directory),
        config.marketplace.engagement(),
    ));

    let app = with_marketplace_routes(engagement)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        default_city = %config.marketplace.default_city,
        "fabrication marketplace ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
