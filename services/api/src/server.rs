use crate::cli::ServeArgs;
use crate::infra::{AppState, SandboxGateway, VerificationState};
use crate::routes::with_verification_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use kyc_gateway::config::{AppConfig, SharedConfig};
use kyc_gateway::error::AppError;
use kyc_gateway::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
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

    telemetry::init(&config.telemetry, config.environment)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let verification_state = VerificationState {
        gateway: Arc::new(SandboxGateway::new(args.sandbox_polls)),
        config: SharedConfig::new(config.verification.clone()),
    };

    let app = with_verification_routes(verification_state)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        verification = ?config.verification,
        "kyc verification gateway ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
