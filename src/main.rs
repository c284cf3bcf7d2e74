use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use moq_relay::cache::Cache;
use moq_relay::origins::Origins;
use moq_relay::tls::Tls;
use moq_relay::{Config, FwdTable, Relay};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	env_logger::init();

	let config = Config::parse();
	let tls = Tls::load(&config)?;

	let fwd = FwdTable::new();
	let cache = Cache::new(Duration::from_millis(config.cache_cleanup_period_ms));

	// Upstream origins run as clients alongside the server.
	let origins = Origins::load(&config, &tls, fwd.clone(), cache.clone());

	let relay = Relay::new(&config, &tls, fwd, cache.clone())?;

	tokio::select! {
		res = relay.serve() => res.context("relay server failed")?,
		_ = shutdown_signal() => log::info!("shutdown signal received"),
	}

	origins.close().await;
	cache.stop().await;

	Ok(())
}

async fn shutdown_signal() {
	#[cfg(unix)]
	{
		let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
			.expect("failed to install signal handler");

		tokio::select! {
			_ = tokio::signal::ctrl_c() => {},
			_ = terminate.recv() => {},
		}
	}

	#[cfg(not(unix))]
	{
		let _ = tokio::signal::ctrl_c().await;
	}
}
