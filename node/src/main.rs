// Copyright (c) 2026 LastWill Contributors. MIT License.
// See LICENSE for details.

//! # LastWill Node
//!
//! Entry point for the `lastwill-node` binary. Parses CLI arguments,
//! initializes logging and metrics, opens the vault store, and serves the
//! REST API against an in-process devnet.
//!
//! The binary supports three subcommands:
//!
//! - `run`    : start the HTTP service
//! - `keygen` : write a fresh account key to disk
//! - `version`: print build version information

mod api;
mod cli;
mod logging;
mod metrics;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::signal;

use lastwill_contracts::{ChainConfig, SimulatedChain};
use lastwill_protocol::config::EngineConfig;
use lastwill_protocol::crypto::AccountKey;
use lastwill_protocol::storage::{open_store, StorageBackend, VaultStore};
use lastwill_protocol::time::SystemClock;
use lastwill_protocol::VaultEngine;

use cli::{Commands, LastWillCli};
use logging::LogFormat;
use metrics::NodeMetrics;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = LastWillCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Keygen(args) => keygen(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Starts the API server and the metrics endpoint.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(logging::NODE_DIRECTIVES, args.log_format());

    let backend = args.storage_backend();
    tracing::info!(
        api_port = args.api_port,
        metrics_port = args.metrics_port,
        data_dir = %args.data_dir.display(),
        store = ?args.store,
        "starting lastwill-node"
    );

    // --- Vault store ---
    if backend != StorageBackend::Memory {
        std::fs::create_dir_all(&args.data_dir).with_context(|| {
            format!("failed to create data directory: {}", args.data_dir.display())
        })?;
    }
    let store = open_store(&backend)
        .with_context(|| format!("failed to open vault store {:?}", backend))?;
    let existing = store.list().context("failed to list stored vaults")?.len();
    tracing::info!(vaults = existing, "vault store opened");

    // --- Devnet + engine ---
    let clock = Arc::new(SystemClock);
    let chain = Arc::new(SimulatedChain::new(
        ChainConfig {
            gas_price: args.gas_price,
            ..ChainConfig::default()
        },
        clock.clone(),
    ));
    let engine = Arc::new(VaultEngine::new(
        chain.clone(),
        store,
        clock,
        EngineConfig {
            disable_attempts: args.disable_attempts,
            ..EngineConfig::default()
        },
    ));

    // --- Metrics ---
    let node_metrics = Arc::new(NodeMetrics::new().context("failed to register metrics")?);

    // --- Application state ---
    let app_state = api::AppState {
        version: format!(
            "{} (protocol {})",
            env!("CARGO_PKG_VERSION"),
            lastwill_protocol::config::PROTOCOL_VERSION,
        ),
        engine,
        chain,
        metrics: Arc::clone(&node_metrics),
    };

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("0.0.0.0:{}", args.api_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {}", api_addr))?;
    tracing::info!("API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&node_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    tracing::info!("lastwill-node stopped");
    Ok(())
}

/// Generates an account key and writes its hex secret to `args.out`.
fn keygen(args: cli::KeygenArgs) -> Result<()> {
    logging::init_logging("lastwill_node=info", LogFormat::Pretty);

    let key_path = &args.out;
    if key_path.exists() && !args.force {
        anyhow::bail!(
            "{} already exists; pass --force to overwrite",
            key_path.display()
        );
    }
    if let Some(parent) = key_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }

    let key = AccountKey::generate();
    std::fs::write(key_path, key.to_hex())
        .with_context(|| format!("failed to write account key to {}", key_path.display()))?;

    // Restrict permissions on Unix.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(key_path, std::fs::Permissions::from_mode(0o600))?;
    }

    tracing::info!(
        address = %key.address(),
        key_path = %key_path.display(),
        "account key generated"
    );

    println!("Account key written.");
    println!("  Key file   : {}", key_path.display());
    println!("  Address    : {}", key.address());
    println!("  Public key : {}", key.public_key().to_hex());

    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("lastwill-node {}", env!("CARGO_PKG_VERSION"));
    println!("protocol      {}", lastwill_protocol::config::PROTOCOL_VERSION);
    println!("record format {}", lastwill_protocol::config::RECORD_FORMAT_VERSION);
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
