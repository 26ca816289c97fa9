//! Vault trust-boundary service entry point: parses CLI flags, resolves
//! configuration, bootstraps the keyset and `VaultService`, then runs
//! whichever transports were selected (stdio / HTTP / binary RPC — any
//! combination, concurrently, all sharing the same in-process
//! `VaultService` so the rate limiter's quota is shared across transports).
//! Bootstrap and shutdown follow the teacher's `citadel-api` main, adapted
//! from a single axum server to a multi-transport one.

mod cli;
mod config;
mod http;
mod observability;
mod rpc;
mod stdio;

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use config::{LogFormat, Transport, VaultConfig};
use observability::HealthChecker;
use vault_core::{KeyStore, TokenValidator, VaultService};
use vault_crypto::{CryptoProvider, HybridCryptoProvider};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli_args = match cli::parse(&args) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let config = match config::resolve(cli_args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(config.log_format);

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "vault-server exited with error");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "vault_server=info,tower_http=info".into());
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

async fn run(config: VaultConfig) -> Result<(), Box<dyn std::error::Error>> {
    let provider: Arc<dyn CryptoProvider> = Arc::new(HybridCryptoProvider);
    let keystore = KeyStore::bootstrap(provider.as_ref(), config.key_dir.clone(), &config.key_id, config.dim, config.index_name.clone())
        .map_err(|e| format!("keyset bootstrap failed: {e}"))?;
    tracing::info!(key_dir = %config.key_dir.display(), key_id = %config.key_id, "keyset ready");

    let validator = TokenValidator::new(config.tokens.clone(), config.rate_limit_max_requests, config.rate_limit_window);
    let service = Arc::new(VaultService::new(keystore, validator, provider));

    let health = Arc::new(HealthChecker::new(config.key_dir.clone()));
    let prometheus = metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()?;

    let shutdown = Arc::new(tokio::sync::Notify::new());
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            wait_for_os_signal().await;
            tracing::info!("shutdown signal received, draining in-flight requests");
            shutdown.notify_waiters();
            tokio::time::sleep(SHUTDOWN_GRACE).await;
            tracing::warn!(grace_period_secs = SHUTDOWN_GRACE.as_secs(), "grace period elapsed, forcing exit");
            std::process::exit(0);
        }
    });

    let mut tasks = tokio::task::JoinSet::new();

    for transport in config.transports.iter().copied() {
        match transport {
            Transport::Stdio => {
                let service = service.clone();
                tracing::info!("starting stdio transport");
                tasks.spawn(async move { stdio::run(service).await.map_err(|e| e.to_string()) });
            }
            Transport::Http => {
                let addr: SocketAddr = format!("{}:{}", config.http_host, config.http_port).parse()?;
                let state = Arc::new(http::AppState { service: service.clone(), health: health.clone(), prometheus: prometheus.clone() });
                let router = http::router(state);
                let shutdown = shutdown.clone();
                tracing::info!(%addr, "starting HTTP transport");
                tasks.spawn(async move {
                    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| e.to_string())?;
                    axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>())
                        .with_graceful_shutdown(async move { shutdown.notified().await })
                        .await
                        .map_err(|e| e.to_string())
                });
            }
            Transport::Rpc => {
                let addr: SocketAddr = format!("0.0.0.0:{}", config.rpc_port).parse()?;
                let service = service.clone();
                let shutdown = shutdown.clone();
                tracing::info!(%addr, "starting binary RPC transport");
                tasks.spawn(async move {
                    rpc::serve(service, addr, async move { shutdown.notified().await }).await.map_err(|e| e.to_string())
                });
            }
        }
    }

    while let Some(result) = tasks.join_next().await {
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e.into()),
            Err(join_err) => return Err(join_err.to_string().into()),
        }
    }
    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
async fn wait_for_os_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
