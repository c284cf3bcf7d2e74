use std::{net, path};

use clap::Parser;

/// A Media-over-QUIC relay: accepts WebTransport sessions from publishers
/// and subscribers and fans objects out between them.
#[derive(Parser, Clone)]
pub struct Config {
	/// Listen for WebTransport sessions on this UDP address
	#[arg(long = "listen_addr", default_value = "[::]:4433")]
	pub listen_addr: net::SocketAddr,

	/// Use the TLS certificate at this path
	#[arg(long = "tls_cert", default_value = "../certs/certificate.pem")]
	pub tls_cert: path::PathBuf,

	/// Use the TLS private key at this path
	#[arg(long = "tls_key", default_value = "../certs/certificate.key")]
	pub tls_key: path::PathBuf,

	/// Default object TTL (in milliseconds)
	#[arg(long = "obj_exp_ms", default_value = "180000")]
	pub obj_exp_ms: u64,

	/// Run the cache cleanup every this often (in milliseconds); 0 disables it
	#[arg(long = "cache_cleanup_period_ms", default_value = "10000")]
	pub cache_cleanup_period_ms: u64,

	/// QUIC keep-alive period (in milliseconds); idle sessions last 3x this
	#[arg(long = "http_conn_time_out_ms", default_value = "10000")]
	pub http_conn_time_out_ms: u64,

	/// JSON file listing upstream MOQ content origins
	#[arg(long = "moq_origins_config", default_value = "../origins/origins.json")]
	pub moq_origins_config: path::PathBuf,
}
