//! fileserver - Browse, search and download a directory tree over HTTP.
//!
//! This binary prepares the served directory and starts the HTTP server.

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fileserver::{config::Config, server::create_router, vfs::DiskFs};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    if let Err(e) = prepare_root(&config.root).await {
        error!("Cannot use {}: {}", config.root.display(), e);
        return ExitCode::FAILURE;
    }

    info!("fileserver v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Root: {}", config.root.display());
    if config.read_only {
        info!("  Mode: read-only");
    } else {
        warn!("  Mode: writable root (mutations are not exposed over HTTP)");
    }
    match &config.cors_origins {
        Some(origins) => info!("  CORS origins: {}", origins.join(", ")),
        None => info!("  CORS origins: any"),
    }

    let vfs = if config.read_only {
        DiskFs::read_only(&config.root)
    } else {
        DiskFs::new(&config.root)
    };
    let router = create_router(vfs, config.router_config());

    let addr = config.bind_address();
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    info!("");
    info!("────────────────────────────────────────────────────────────────");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Browse:     open http://{}/", addr);
    info!("  Search:     curl 'http://{}/?q=<text>'", addr);
    info!("  Zip a dir:  curl -OJ 'http://{}/<dir>/?download'", addr);
    info!("────────────────────────────────────────────────────────────────");
    info!("");

    if let Err(e) = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Server stopped");
    ExitCode::SUCCESS
}

/// Make sure the served directory exists.
async fn prepare_root(root: &Path) -> std::io::Result<()> {
    match tokio::fs::metadata(root).await {
        Ok(meta) if meta.is_dir() => {
            info!("Using existing directory {}", root.display());
            Ok(())
        }
        Ok(_) => Err(std::io::Error::new(
            std::io::ErrorKind::Other,
            "not a directory",
        )),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tokio::fs::create_dir_all(root).await?;
            info!("Created new directory {}", root.display());
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Resolve on Ctrl-C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "fileserver=debug,tower_http=debug"
    } else {
        "fileserver=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
