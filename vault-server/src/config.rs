//! Environment + CLI configuration resolution, per SPEC_FULL.md §6.3.
//! CLI flags take precedence over environment variables when both are given.

use std::collections::HashSet;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::cli::CliArgs;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Stdio,
    Http,
    Rpc,
}

impl Transport {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "stdio" => Some(Self::Stdio),
            "http" => Some(Self::Http),
            "rpc" => Some(Self::Rpc),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct VaultConfig {
    pub transports: Vec<Transport>,
    pub http_host: String,
    pub http_port: u16,
    pub rpc_port: u16,
    pub key_dir: PathBuf,
    pub key_id: String,
    pub dim: u32,
    pub tokens: HashSet<String>,
    pub index_name: Option<String>,
    pub rate_limit_max_requests: u32,
    pub rate_limit_window: Duration,
    pub log_format: LogFormat,
}

/// Loaded when `VAULT_TOKENS` is unset, matching the original server's
/// hardcoded `VALID_TOKENS` set. Never appropriate outside a demo.
fn demo_tokens() -> HashSet<String> {
    HashSet::from(["envector-team-alpha".to_string(), "envector-admin-001".to_string()])
}

pub fn resolve(cli: CliArgs) -> Result<VaultConfig, String> {
    let transports = if !cli.transports.is_empty() {
        cli.transports
            .iter()
            .map(|s| Transport::parse(s).ok_or_else(|| format!("unknown transport: {s}")))
            .collect::<Result<Vec<_>, _>>()?
    } else {
        // No transport named on either CLI or env: default to the HTTP tool
        // protocol plus observability endpoints, the most common deployment.
        vec![Transport::Http]
    };

    let http_host = cli.http_host.or_else(|| env::var("VAULT_HTTP_HOST").ok()).unwrap_or_else(|| "0.0.0.0".to_string());
    let http_port = cli
        .http_port
        .or_else(|| env::var("VAULT_HTTP_PORT").ok().and_then(|v| v.parse().ok()))
        .unwrap_or(8080);
    let rpc_port = cli
        .rpc_port
        .or_else(|| env::var("VAULT_RPC_PORT").ok().and_then(|v| v.parse().ok()))
        .unwrap_or(50080);
    let key_dir = cli.key_dir.or_else(|| env::var("VAULT_KEY_DIR").ok()).unwrap_or_else(|| "vault_keys".to_string());
    let key_id = cli.key_id.or_else(|| env::var("VAULT_KEY_ID").ok()).unwrap_or_else(|| "vault-key".to_string());
    let dim = cli.dim.or_else(|| env::var("VAULT_DIM").ok().and_then(|v| v.parse().ok())).unwrap_or(1024);

    let tokens = match env::var("VAULT_TOKENS") {
        Ok(raw) => raw.split(',').map(|t| t.trim().to_string()).filter(|t| !t.is_empty()).collect(),
        Err(_) => {
            tracing::warn!("VAULT_TOKENS is unset; loading the demo token set — do not use in production");
            demo_tokens()
        }
    };
    let index_name = env::var("VAULT_INDEX_NAME").ok();

    let rate_limit_max_requests = env::var("VAULT_RATE_LIMIT_MAX_REQUESTS").ok().and_then(|v| v.parse().ok()).unwrap_or(30);
    let rate_limit_window_secs: u64 = env::var("VAULT_RATE_LIMIT_WINDOW_SECONDS").ok().and_then(|v| v.parse().ok()).unwrap_or(60);

    let log_format = match env::var("VAULT_LOG_FORMAT").as_deref() {
        Ok("json") => LogFormat::Json,
        _ => LogFormat::Pretty,
    };

    Ok(VaultConfig {
        transports,
        http_host,
        http_port,
        rpc_port,
        key_dir: PathBuf::from(key_dir),
        key_id,
        dim,
        tokens,
        index_name,
        rate_limit_max_requests,
        rate_limit_window: Duration::from_secs(rate_limit_window_secs),
        log_format,
    })
}
