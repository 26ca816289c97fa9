//! Binary RPC transport: a `tonic` server implementing the generated
//! `VaultService` trait, wired to `vault_core::VaultService`, plus the
//! standard `grpc.health.v1` service registered under both the concrete
//! service name and the empty name (overall-server health), matching the
//! dual registration in the original gRPC server.

use std::net::SocketAddr;
use std::sync::Arc;

use tonic::transport::Server;
use tonic::{Request, Response, Status};

use vault_proto::vault_service_server::{VaultService as VaultServiceTrait, VaultServiceServer};
use vault_proto::{
    DecryptMetadataRequest, DecryptMetadataResponse, DecryptScoresRequest, DecryptScoresResponse, GetPublicKeyRequest,
    GetPublicKeyResponse, ScoreEntry,
};

use vault_core::{Outcome, VaultError, VaultService};

/// EvalKey bundles can run tens of MB; allow up to 256 MiB in each
/// direction, matching the tool-protocol surface's limit.
const MAX_MESSAGE_BYTES: usize = 256 * 1024 * 1024;

const SERVICE_FULL_NAME: &str = "rune.vault.v1.VaultService";

pub struct RpcVault {
    service: Arc<VaultService>,
}

impl RpcVault {
    pub fn new(service: Arc<VaultService>) -> Self {
        Self { service }
    }
}

#[tonic::async_trait]
impl VaultServiceTrait for RpcVault {
    async fn get_public_key(&self, request: Request<GetPublicKeyRequest>) -> Result<Response<GetPublicKeyResponse>, Status> {
        let token = request.into_inner().token;
        let service = self.service.clone();
        let outcome = tokio::task::spawn_blocking(move || service.get_public_key("rpc", &token))
            .await
            .map_err(|_| Status::internal("worker task panicked"))?;

        match outcome {
            Outcome::Json(key_bundle_json) => Ok(Response::new(GetPublicKeyResponse { key_bundle_json, error: String::new() })),
            Outcome::Thrown(err) => Err(thrown_to_status(&err)),
        }
    }

    async fn decrypt_scores(&self, request: Request<DecryptScoresRequest>) -> Result<Response<DecryptScoresResponse>, Status> {
        let req = request.into_inner();
        let service = self.service.clone();
        let outcome = tokio::task::spawn_blocking(move || service.decrypt_scores("rpc", &req.token, &req.encrypted_blob_b64, req.top_k))
            .await
            .map_err(|_| Status::internal("worker task panicked"))?;

        match outcome {
            Outcome::Json(json) => {
                let (entries, error) = parse_score_entries(&json);
                Ok(Response::new(DecryptScoresResponse { entries, error }))
            }
            Outcome::Thrown(err) => Err(thrown_to_status(&err)),
        }
    }

    async fn decrypt_metadata(&self, request: Request<DecryptMetadataRequest>) -> Result<Response<DecryptMetadataResponse>, Status> {
        let req = request.into_inner();
        let service = self.service.clone();
        let outcome = tokio::task::spawn_blocking(move || service.decrypt_metadata("rpc", &req.token, &req.encrypted_metadata_list))
            .await
            .map_err(|_| Status::internal("worker task panicked"))?;

        match outcome {
            Outcome::Json(json) => {
                let (decrypted_metadata, error) = parse_metadata_list(&json);
                Ok(Response::new(DecryptMetadataResponse { decrypted_metadata, error }))
            }
            Outcome::Thrown(err) => Err(thrown_to_status(&err)),
        }
    }
}

/// Thrown errors carry no response message in gRPC (a non-OK status
/// suppresses delivery of the body), so the `error` field the tool
/// protocol uses becomes the `Status` details string here instead.
fn thrown_to_status(err: &VaultError) -> Status {
    match err {
        VaultError::Unauthenticated => Status::unauthenticated(err.to_string()),
        VaultError::RateLimited { .. } => Status::unauthenticated(err.to_string()),
        _ => Status::internal(err.to_string()),
    }
}

fn parse_score_entries(json: &str) -> (Vec<ScoreEntry>, String) {
    let value: serde_json::Value = serde_json::from_str(json).unwrap_or(serde_json::Value::Null);
    if let Some(arr) = value.as_array() {
        let entries = arr
            .iter()
            .filter_map(|v| {
                Some(ScoreEntry {
                    shard_idx: v.get("shard_idx")?.as_i64()?,
                    row_idx: v.get("row_idx")?.as_i64()?,
                    score: v.get("score")?.as_f64()?,
                })
            })
            .collect();
        (entries, String::new())
    } else if let Some(err) = value.get("error").and_then(|e| e.as_str()) {
        (Vec::new(), err.to_string())
    } else {
        (Vec::new(), "malformed response".to_string())
    }
}

fn parse_metadata_list(json: &str) -> (Vec<String>, String) {
    let value: serde_json::Value = serde_json::from_str(json).unwrap_or(serde_json::Value::Null);
    if let Some(arr) = value.as_array() {
        let items = arr
            .iter()
            .map(|v| match v {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect();
        (items, String::new())
    } else if let Some(err) = value.get("error").and_then(|e| e.as_str()) {
        (Vec::new(), err.to_string())
    } else {
        (Vec::new(), "malformed response".to_string())
    }
}

pub async fn serve(service: Arc<VaultService>, addr: SocketAddr, shutdown: impl std::future::Future<Output = ()>) -> Result<(), tonic::transport::Error> {
    let rpc_vault = RpcVault::new(service);
    let server = VaultServiceServer::new(rpc_vault)
        .max_decoding_message_size(MAX_MESSAGE_BYTES)
        .max_encoding_message_size(MAX_MESSAGE_BYTES);

    let (mut health_reporter, health_service) = tonic_health::server::health_reporter();
    health_reporter.set_serving::<VaultServiceServer<RpcVault>>().await;
    health_reporter.set_service_status(SERVICE_FULL_NAME, tonic_health::ServingStatus::Serving).await;
    health_reporter.set_service_status("", tonic_health::ServingStatus::Serving).await;

    Server::builder()
        .layer(tower::limit::ConcurrencyLimitLayer::new(4))
        .add_service(server)
        .add_service(health_service)
        .serve_with_shutdown(addr, shutdown)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_score_entries_from_success_array() {
        let json = r#"[{"shard_idx": 20, "row_idx": 0, "score": 0.9}]"#;
        let (entries, error) = parse_score_entries(json);
        assert_eq!(entries.len(), 1);
        assert!(error.is_empty());
        assert_eq!(entries[0].shard_idx, 20);
    }

    #[test]
    fn parses_score_entries_from_soft_error_object() {
        let json = r#"{"error": "Rate Limit Exceeded: Max top_k is 10"}"#;
        let (entries, error) = parse_score_entries(json);
        assert!(entries.is_empty());
        assert_eq!(error, "Rate Limit Exceeded: Max top_k is 10");
    }

    #[test]
    fn parses_metadata_list_serializing_non_strings_to_json_text() {
        let json = r#"["plain", {"nested": 1}]"#;
        let (items, error) = parse_metadata_list(json);
        assert!(error.is_empty());
        assert_eq!(items[0], "plain");
        assert_eq!(items[1], r#"{"nested":1}"#);
    }
}
