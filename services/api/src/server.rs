use crate::cli::ServeArgs;
use crate::infra::{
    AppState, InMemoryAttachmentStorage, InMemoryEventRepository, SimulatedGovernmentChannel,
};
use crate::routes::with_esocial_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use domestica::config::AppConfig;
use domestica::error::AppError;
use domestica::esocial::EsocialEventService;
use domestica::telemetry;
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

    let repository = Arc::new(InMemoryEventRepository::default());
    let storage = Arc::new(InMemoryAttachmentStorage::default());
    let channel = Arc::new(SimulatedGovernmentChannel::default());
    let event_service = Arc::new(EsocialEventService::new(
        repository,
        channel,
        storage,
        config.esocial.politica_envio(),
        config.esocial.politica_anexos(),
    ));

    let app = with_esocial_routes(event_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "esocial compliance service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
