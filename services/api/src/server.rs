use crate::cli::ServeArgs;
use crate::infra::{seed_demo_data, AppState, InMemoryWorkflowBackend};
use crate::routes::with_approval_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use hr_ops::config::AppConfig;
use hr_ops::error::AppError;
use hr_ops::telemetry;
use hr_ops::workflows::approvals::ApprovalService;
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

    let backend = Arc::new(InMemoryWorkflowBackend::default());
    if args.seed_demo {
        seed_demo_data(&backend);
    }
    let approval_service = Arc::new(ApprovalService::new(
        backend.clone(),
        backend.clone(),
        backend.clone(),
        backend,
    ));

    let app = with_approval_routes(approval_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "approval workflow service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
