//! C7 — the three-operation `VaultService`, shared verbatim by every
//! transport (stdio, HTTP, binary RPC). `dispatch` is the single place
//! that times a request, records `vault_requests_total` /
//! `vault_request_duration_seconds`, and applies the thrown-vs-soft-error
//! policy, so no transport can implement that asymmetry differently.

use std::sync::Arc;
use std::time::Instant;

use vault_crypto::CryptoProvider;

use crate::decrypt;
use crate::error::{Outcome, VaultError};
use crate::keystore::KeyStore;
use crate::auth::TokenValidator;
use crate::metadata;

pub struct VaultService {
    keystore: KeyStore,
    validator: TokenValidator,
    provider: Arc<dyn CryptoProvider>,
}

impl VaultService {
    pub fn new(keystore: KeyStore, validator: TokenValidator, provider: Arc<dyn CryptoProvider>) -> Self {
        Self { keystore, validator, provider }
    }

    pub fn get_public_key(&self, transport: &'static str, token: &str) -> Outcome {
        self.dispatch("get_public_key", transport, || {
            self.validator.validate(token)?;
            Ok(self.keystore.public_bundle_json())
        })
    }

    pub fn decrypt_scores(&self, transport: &'static str, token: &str, encrypted_blob_b64: &str, top_k: i32) -> Outcome {
        self.dispatch("decrypt_scores", transport, || {
            self.validator.validate(token)?;
            Ok(decrypt::decrypt_scores(
                self.provider.as_ref(),
                self.keystore.cipher().as_ref(),
                &self.keystore.paths().sec_key(),
                encrypted_blob_b64,
                top_k,
            ))
        })
    }

    pub fn decrypt_metadata(&self, transport: &'static str, token: &str, encrypted_metadata_list: &[String]) -> Outcome {
        self.dispatch("decrypt_metadata", transport, || {
            self.validator.validate(token)?;
            Ok(metadata::decrypt_metadata(
                self.provider.as_ref(),
                &self.keystore.paths().metadata_key(),
                self.keystore.has_metadata_key(),
                encrypted_metadata_list,
            ))
        })
    }

    fn dispatch(&self, method: &'static str, transport: &'static str, f: impl FnOnce() -> Result<String, VaultError>) -> Outcome {
        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();
        metrics::histogram!("vault_request_duration_seconds", "method" => method, "transport" => transport).record(elapsed.as_secs_f64());

        match result {
            Ok(json) => {
                let status = if is_soft_error_json(&json) { "error" } else { "success" };
                metrics::counter!("vault_requests_total", "method" => method, "transport" => transport, "status" => status).increment(1);
                Outcome::Json(json)
            }
            Err(e) => {
                tracing::warn!(method, transport, error = %e, "request failed");
                e.into_response(method, transport)
            }
        }
    }
}

/// A soft error is a JSON object with an `error` key (`{"error": "..."}`);
/// everything else `dispatch`'s `f()` can return is a genuine success
/// payload (an object or an array), so this is enough to tell them apart
/// without threading a separate signal through every operation.
fn is_soft_error_json(json: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(json).ok().and_then(|v| v.as_object().map(|o| o.contains_key("error"))).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::time::Duration;
    use vault_crypto::HybridCryptoProvider;

    fn service(dir: &std::path::Path) -> VaultService {
        let provider: Arc<dyn CryptoProvider> = Arc::new(HybridCryptoProvider);
        let keystore = KeyStore::bootstrap(provider.as_ref(), dir, "vault-key", 4, None).unwrap();
        let validator = TokenValidator::new(HashSet::from(["T".to_string()]), 30, Duration::from_secs(60));
        VaultService::new(keystore, validator, provider)
    }

    #[test]
    fn get_public_key_with_valid_token_returns_json() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path());
        match svc.get_public_key("stdio", "T") {
            Outcome::Json(json) => {
                let v: serde_json::Value = serde_json::from_str(&json).unwrap();
                assert!(v.get("EncKey").is_some());
            }
            Outcome::Thrown(e) => panic!("unexpected thrown error: {e}"),
        }
    }

    #[test]
    fn get_public_key_with_invalid_token_is_thrown() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path());
        match svc.get_public_key("stdio", "WRONG") {
            Outcome::Thrown(VaultError::Unauthenticated) => {}
            _ => panic!("expected thrown Unauthenticated, got a different outcome"),
        }
    }

    #[test]
    fn decrypt_scores_top_k_policy_violation_is_json_not_thrown() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(dir.path());
        match svc.decrypt_scores("http", "T", "", 11) {
            Outcome::Json(json) => assert!(json.contains("error")),
            Outcome::Thrown(e) => panic!("policy violations must be soft errors, got thrown {e}"),
        }
    }

    #[test]
    fn soft_error_json_is_detected_regardless_of_key_order_or_whitespace() {
        assert!(is_soft_error_json(r#"{"error": "bad base64"}"#));
        assert!(is_soft_error_json(r#"{ "other": 1, "error": "x" }"#));
        assert!(!is_soft_error_json(r#"{"EncKey": "...", "EvalKey": "..."}"#));
        assert!(!is_soft_error_json(r#"[{"shard_idx": 0, "row_idx": 0, "score": 0.5}]"#));
    }
}
