// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wgsync_config::{LogFormat, LoggingConfig, ServiceConfig};
use wgsync_reconcile::ReconcileRunner;
use wgsync_server::{create_router, AppState, Components};

/// wgsync-server - provisions WireGuard peers for Headscale nodes.
#[derive(Parser, Debug)]
#[command(
	name = "wgsync-server",
	about = "Headscale to WireGuard peer sync service",
	version
)]
struct Args {
	/// Path to a TOML config file (default: /etc/wgsync/config.toml)
	#[arg(long, env = "WGSYNC_CONFIG")]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Run the reconciliation loop and the query API (default)
	Serve,
	/// Run a single reconciliation cycle and exit
	Once,
	/// Show version information
	Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = parse_args(None, std::env::args_os());

	if let Some(Command::Version) = args.command {
		println!("wgsync-server version: {}", env!("CARGO_PKG_VERSION"));
		return Ok(());
	}

	let config = match &args.config {
		Some(path) => wgsync_config::load_config_with_file(path),
		None => wgsync_config::load_config(),
	}
	.context("failed to load configuration")?;

	init_tracing(&config.logging);

	let components =
		Components::from_config(&config).context("invalid WireGuard address pool")?;

	match args.command {
		Some(Command::Once) => run_once(components).await,
		_ => serve(config, components).await,
	}
}

/// Loads `.env` (or `env_file`) before clap runs, so it can supply
/// `WGSYNC_CONFIG`.
fn parse_args(env_file: Option<&Path>, argv: impl IntoIterator<Item = OsString>) -> Args {
	match env_file {
		Some(path) => {
			dotenvy::from_path(path).ok();
		}
		None => {
			dotenvy::dotenv().ok();
		}
	}
	Args::parse_from(argv)
}

fn init_tracing(logging: &LoggingConfig) {
	let json = logging.format == LogFormat::Json;

	tracing_subscriber::registry()
		.with(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| logging.level.clone().into()),
		)
		.with(json.then(|| tracing_subscriber::fmt::layer().json()))
		.with((!json).then(tracing_subscriber::fmt::layer))
		.init();
}

async fn run_once(components: Components) -> anyhow::Result<()> {
	let report = components.reconciler.run_cycle().await;
	println!("{}", serde_json::to_string_pretty(&report)?);

	if let Some(error) = &report.directory_error {
		anyhow::bail!("directory unavailable: {error}");
	}
	if !report.failed.is_empty() {
		anyhow::bail!("{} node(s) failed to provision", report.failed.len());
	}
	Ok(())
}

async fn serve(config: ServiceConfig, components: Components) -> anyhow::Result<()> {
	tracing::info!(
		host = %config.http.host,
		port = config.http.port,
		directory = %config.directory.url,
		container = %config.wireguard.container_name,
		"starting wgsync-server"
	);

	let runner = ReconcileRunner::new(components.reconciler, config.sync.poll_interval);
	runner.start().await;

	let app = create_router(AppState {
		state: components.state,
		renderer: components.renderer,
		last_report: runner.last_report(),
	});

	let addr = config.socket_addr();
	let listener = tokio::net::TcpListener::bind(&addr)
		.await
		.with_context(|| format!("failed to bind {addr}"))?;
	tracing::info!("listening on {}", addr);

	let served = axum::serve(listener, app)
		.with_graceful_shutdown(shutdown_signal())
		.await;
	if let Err(e) = &served {
		tracing::error!(error = %e, "Server error");
	}

	tracing::info!("Shutting down reconciliation loop...");
	runner.shutdown().await;

	tracing::info!("Server shutdown complete");
	served.map_err(Into::into)
}

async fn shutdown_signal() {
	let ctrl_c = async {
		if let Err(e) = tokio::signal::ctrl_c().await {
			tracing::error!(error = %e, "failed to listen for ctrl-c");
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
				tracing::error!(error = %e, "failed to listen for SIGTERM");
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

	tracing::info!("Received shutdown signal");
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;

	#[test]
	fn dotenv_file_supplies_config_path() {
		let temp = TempDir::new().unwrap();
		let env_file = temp.path().join(".env");
		let config = temp.path().join("from-dotenv.toml");
		std::fs::write(&env_file, format!("WGSYNC_CONFIG={}\n", config.display())).unwrap();
		std::env::remove_var("WGSYNC_CONFIG");

		let args = parse_args(Some(&env_file), [OsString::from("wgsync-server"), "once".into()]);

		assert_eq!(args.config, Some(config));
		assert!(matches!(args.command, Some(Command::Once)));
	}
}
