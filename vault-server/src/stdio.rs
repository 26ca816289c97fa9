//! Stdio transport: one process per client, newline-delimited JSON-RPC-
//! shaped frames (`{"id", "tool", "args"}` in, `{"id", "result"}` /
//! `{"id", "error"}` out), cooperative single-threaded — a single task
//! reading stdin line by line, matching the original FastMCP server's
//! stdio entry point but with an explicit wire framing instead of the MCP
//! SDK's own transport.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use vault_core::{Outcome, VaultService};

#[derive(Deserialize)]
struct Frame {
    id: serde_json::Value,
    tool: String,
    #[serde(default)]
    args: serde_json::Value,
}

#[derive(Serialize)]
struct ResultFrame<'a> {
    id: &'a serde_json::Value,
    result: serde_json::Value,
}

#[derive(Serialize)]
struct ErrorFrame<'a> {
    id: &'a serde_json::Value,
    error: String,
}

pub async fn run(service: Arc<VaultService>) -> std::io::Result<()> {
    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = handle_line(&service, &line).await;
        stdout.write_all(response.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }
    Ok(())
}

async fn handle_line(service: &VaultService, line: &str) -> String {
    let frame: Frame = match serde_json::from_str(line) {
        Ok(f) => f,
        Err(e) => return serde_json::to_string(&ErrorFrame { id: &serde_json::Value::Null, error: format!("malformed frame: {e}") }).unwrap(),
    };

    let outcome = dispatch(service, &frame).await;
    match outcome {
        Ok(json) => {
            let value: serde_json::Value = serde_json::from_str(&json).unwrap_or(serde_json::Value::String(json));
            serde_json::to_string(&ResultFrame { id: &frame.id, result: value }).unwrap()
        }
        Err(message) => serde_json::to_string(&ErrorFrame { id: &frame.id, error: message }).unwrap(),
    }
}

async fn dispatch(service: &VaultService, frame: &Frame) -> Result<String, String> {
    let outcome = match frame.tool.as_str() {
        "get_public_key" => {
            let token = frame.args.get("token").and_then(|v| v.as_str()).ok_or("missing argument: token")?.to_string();
            service.get_public_key("stdio", &token)
        }
        "decrypt_scores" => {
            let token = frame.args.get("token").and_then(|v| v.as_str()).ok_or("missing argument: token")?.to_string();
            let blob = frame.args.get("encrypted_blob_b64").and_then(|v| v.as_str()).ok_or("missing argument: encrypted_blob_b64")?.to_string();
            let top_k = frame.args.get("top_k").and_then(|v| v.as_i64()).unwrap_or(5) as i32;
            service.decrypt_scores("stdio", &token, &blob, top_k)
        }
        "decrypt_metadata" => {
            let token = frame.args.get("token").and_then(|v| v.as_str()).ok_or("missing argument: token")?.to_string();
            let list: Vec<String> = frame
                .args
                .get("encrypted_metadata_list")
                .and_then(|v| v.as_array())
                .ok_or("missing argument: encrypted_metadata_list")?
                .iter()
                .filter_map(|v| v.as_str().map(|s| s.to_string()))
                .collect();
            service.decrypt_metadata("stdio", &token, &list)
        }
        other => return Err(format!("unknown tool: {other}")),
    };

    match outcome {
        Outcome::Json(json) => Ok(json),
        Outcome::Thrown(err) => Err(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::time::Duration;

    use vault_core::{KeyStore, TokenValidator};
    use vault_crypto::HybridCryptoProvider;

    fn service() -> VaultService {
        let dir = tempfile::tempdir().unwrap();
        let provider: Arc<dyn vault_crypto::CryptoProvider> = Arc::new(HybridCryptoProvider);
        let keystore = KeyStore::bootstrap(provider.as_ref(), dir.path(), "vault-key", 8, None).unwrap();
        let validator = TokenValidator::new(HashSet::from(["good".to_string()]), 30, Duration::from_secs(60));
        VaultService::new(keystore, validator, provider)
    }

    #[tokio::test]
    async fn unknown_tool_name_is_an_error_frame() {
        let svc = service();
        let response = handle_line(&svc, r#"{"id": 1, "tool": "bogus", "args": {}}"#).await;
        let parsed: serde_json::Value = serde_json::from_str(&response).unwrap();
        assert!(parsed.get("error").is_some());
        assert_eq!(parsed["id"], 1);
    }

    #[tokio::test]
    async fn get_public_key_with_valid_token_returns_result_frame() {
        let svc = service();
        let response = handle_line(&svc, r#"{"id": "a", "tool": "get_public_key", "args": {"token": "good"}}"#).await;
        let parsed: serde_json::Value = serde_json::from_str(&response).unwrap();
        assert!(parsed.get("result").is_some());
    }

    #[tokio::test]
    async fn invalid_token_is_an_error_frame() {
        let svc = service();
        let response = handle_line(&svc, r#"{"id": 2, "tool": "get_public_key", "args": {"token": "bad"}}"#).await;
        let parsed: serde_json::Value = serde_json::from_str(&response).unwrap();
        assert!(parsed.get("error").is_some());
    }
}
