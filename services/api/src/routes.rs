use crate::infra::{AppState, VerificationState};
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use kyc_gateway::error::AppError;
use kyc_gateway::workflows::verification::{
    Customer, VerificationOrchestrator, VerificationResult,
};
use serde_json::json;
use tracing::info;

pub(crate) fn verification_router(state: VerificationState) -> Router {
    Router::new()
        .route("/api/v1/verifications", post(verification_endpoint))
        .with_state(state)
}

pub(crate) fn with_verification_routes(state: VerificationState) -> Router {
    verification_router(state)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
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

/// Runs one workflow on its own task and returns the classified outcome.
pub(crate) async fn verification_endpoint(
    State(state): State<VerificationState>,
    Json(customer): Json<Customer>,
) -> Result<Json<VerificationResult>, AppError> {
    let config = state.config.snapshot();
    let orchestrator = VerificationOrchestrator::from_config(state.gateway.clone(), &config);

    let workflow = tokio::spawn(async move { orchestrator.verify(&customer).await });
    let result = workflow
        .await
        .map_err(|err| AppError::Server(axum::Error::new(err)))??;

    info!(status = result.status.label(), "verification request finished");
    Ok(Json(result))
}
