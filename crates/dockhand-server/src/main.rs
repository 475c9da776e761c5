//! dockhand - compose service control plane

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use dockhand_config::{ConfigError, Settings};
use dockhand_core::{ManagerOptions, ServiceManager};
use dockhand_runtime::{create_runtime, ComposeRuntime};
use dockhand_server::http::router::build_router;
use dockhand_server::{ApiCredentials, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "dockhand")]
#[command(author, version, about = "Compose service control plane", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    /// Config file (defaults to ~/.config/dockhand/config.toml)
    #[arg(short, long, env = "DOCKHAND_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.log_json);

    let settings = Settings::load(cli.config.as_deref())?;
    settings.validate()?;

    let (Some(username), Some(password)) = (&settings.auth.username, &settings.auth.password)
    else {
        return Err(ConfigError::Missing("API_USERNAME").into());
    };
    let auth = ApiCredentials::new(username, password);

    let runtime = create_runtime(&settings.runtime);
    let runtime_info = runtime.info();

    let addr = settings.listen_addr()?;
    let mut options = ManagerOptions::new(settings.base_dir()?);
    options.log_tail_lines = settings.services.log_tail_lines;
    options.registry = settings.registry;

    let manager = ServiceManager::new(Box::new(runtime), options);
    if manager.runtime_available().await {
        tracing::info!("Using container runtime `{}`", runtime_info);
    } else {
        tracing::warn!(
            "Container runtime `{}` is not responding; lifecycle operations will fail until it is available",
            runtime_info
        );
    }
    manager.ensure_base_dir()?;
    tracing::info!("Managing services under {}", manager.base_dir().display());

    let router = build_router(AppState::new(manager, auth));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

fn init_tracing(verbose: bool, json: bool) {
    // RUST_LOG wins when set
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(false))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .init();
    }
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
