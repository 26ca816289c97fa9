//! HTTP transport: the three tool-protocol routes (§6.1) plus the five
//! observability routes (§6.5). Router assembly follows the teacher's
//! `citadel-api` shape (`Arc<AppState>` shared state, CORS layer), adapted
//! from a CRUD resource API to this fixed three-operation surface.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};

use vault_core::{Outcome, VaultError, VaultService};

use crate::observability::HealthChecker;

pub struct AppState {
    pub service: Arc<VaultService>,
    pub health: Arc<HealthChecker>,
    pub prometheus: metrics_exporter_prometheus::PrometheusHandle,
}

pub type Shared = Arc<AppState>;

pub fn router(state: Shared) -> Router {
    Router::new()
        .route("/get_public_key", post(get_public_key))
        .route("/decrypt_scores", post(decrypt_scores))
        .route("/decrypt_metadata", post(decrypt_metadata))
        .route("/health", get(health))
        .route("/health/ready", get(health_ready))
        .route("/health/live", get(health_live))
        .route("/metrics", get(metrics_endpoint))
        .route("/status", get(status))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .with_state(state)
}

#[derive(Deserialize)]
struct GetPublicKeyRequest {
    token: String,
}

#[derive(Deserialize)]
struct DecryptScoresRequest {
    token: String,
    encrypted_blob_b64: String,
    #[serde(default = "default_top_k")]
    top_k: i32,
}

fn default_top_k() -> i32 {
    5
}

#[derive(Deserialize)]
struct DecryptMetadataRequest {
    token: String,
    encrypted_metadata_list: Vec<String>,
}

async fn get_public_key(State(state): State<Shared>, Json(req): Json<GetPublicKeyRequest>) -> Response {
    let outcome = tokio::task::spawn_blocking(move || state.service.get_public_key("http", &req.token))
        .await
        .expect("get_public_key task panicked");
    outcome_to_response(outcome)
}

async fn decrypt_scores(State(state): State<Shared>, Json(req): Json<DecryptScoresRequest>) -> Response {
    let outcome = tokio::task::spawn_blocking(move || {
        state.service.decrypt_scores("http", &req.token, &req.encrypted_blob_b64, req.top_k)
    })
    .await
    .expect("decrypt_scores task panicked");
    outcome_to_response(outcome)
}

async fn decrypt_metadata(State(state): State<Shared>, Json(req): Json<DecryptMetadataRequest>) -> Response {
    let outcome = tokio::task::spawn_blocking(move || state.service.decrypt_metadata("http", &req.token, &req.encrypted_metadata_list))
        .await
        .expect("decrypt_metadata task panicked");
    outcome_to_response(outcome)
}

/// Tool-protocol responses are always a JSON body; thrown errors still carry
/// a meaningful HTTP status so proxies/load balancers can distinguish them,
/// but the body shape (`{"error": "..."}`) matches the soft-error shape.
fn outcome_to_response(outcome: Outcome) -> Response {
    match outcome {
        Outcome::Json(body) => (StatusCode::OK, [(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Outcome::Thrown(err) => {
            let status = match &err {
                VaultError::Unauthenticated => StatusCode::UNAUTHORIZED,
                VaultError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            let body = serde_json::json!({ "error": err.to_string() }).to_string();
            (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
        }
    }
}

async fn health(State(state): State<Shared>) -> Response {
    let health = state.health.clone();
    let report = tokio::task::spawn_blocking(move || health.run_checks()).await.expect("health check task panicked");
    let status = if matches!(report.overall, crate::observability::Status::Unhealthy) {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (status, Json(report)).into_response()
}

async fn health_ready(State(state): State<Shared>) -> Response {
    let health = state.health.clone();
    let report = tokio::task::spawn_blocking(move || health.run_checks()).await.expect("health check task panicked");
    let keys_healthy = report.checks.get("keys").map(|c| matches!(c.status, crate::observability::Status::Healthy)).unwrap_or(false);
    let status = if keys_healthy { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status, Json(report)).into_response()
}

async fn health_live() -> Response {
    (StatusCode::OK, Json(serde_json::json!({ "status": "live" }))).into_response()
}

async fn metrics_endpoint(State(state): State<Shared>) -> Response {
    (StatusCode::OK, state.prometheus.render()).into_response()
}

async fn status(State(state): State<Shared>) -> Response {
    let health = state.health.clone();
    let report = tokio::task::spawn_blocking(move || health.last_report().unwrap_or_else(|| health.run_checks()))
        .await
        .expect("health check task panicked");
    let body = serde_json::json!({
        "uptime_seconds": state.health.uptime_seconds(),
        "started_at": state.health.started_at_utc(),
        "last_check": report,
    });
    (StatusCode::OK, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthenticated_is_mapped_to_401() {
        let response = outcome_to_response(Outcome::Thrown(VaultError::Unauthenticated));
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn rate_limited_is_mapped_to_429() {
        let response = outcome_to_response(Outcome::Thrown(VaultError::RateLimited { retry_after_secs: 7 }));
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn internal_is_mapped_to_500() {
        let response = outcome_to_response(Outcome::Thrown(VaultError::Internal("boom".to_string())));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn soft_error_json_is_200_with_error_body() {
        let response = outcome_to_response(Outcome::Json(r#"{"error":"Rate Limit Exceeded: Max top_k is 10"}"#.to_string()));
        assert_eq!(response.status(), StatusCode::OK);
    }
}
