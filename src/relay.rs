use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::task::JoinSet;

use crate::cache::Cache;
use crate::config::Config;
use crate::connection::Connection;
use crate::fwdtable::FwdTable;
use crate::tls::Tls;

/// The path WebTransport sessions must CONNECT to.
pub const ENDPOINT_PATH: &str = "/moq";

/// The QUIC endpoint accepting publisher and subscriber sessions.
pub struct Relay {
	endpoint: quinn::Endpoint,
	fwd: FwdTable,
	cache: Cache,
	obj_expiration: Duration,
}

impl Relay {
	pub fn new(config: &Config, tls: &Tls, fwd: FwdTable, cache: Cache) -> anyhow::Result<Self> {
		let mut transport = quinn::TransportConfig::default();
		let keep_alive = Duration::from_millis(config.http_conn_time_out_ms);
		transport.keep_alive_interval(Some(keep_alive));
		transport.max_idle_timeout(Some((3 * keep_alive).try_into().context("invalid idle timeout")?));
		let transport = Arc::new(transport);

		let mut server_config = quinn::ServerConfig::with_crypto(Arc::new(tls.server()?));
		server_config.transport_config(transport);

		let endpoint = quinn::Endpoint::server(server_config, config.listen_addr)
			.context("failed to bind UDP socket")?;

		Ok(Self {
			endpoint,
			fwd,
			cache,
			obj_expiration: Duration::from_millis(config.obj_exp_ms),
		})
	}

	pub async fn serve(self) -> anyhow::Result<()> {
		log::info!("listening on {}", self.endpoint.local_addr()?);

		let mut conns = JoinSet::new();

		loop {
			tokio::select! {
				res = self.endpoint.accept() => {
					let Some(conn) = res else { return Ok(()) };

					let fwd = self.fwd.clone();
					let cache = self.cache.clone();
					let expiration = self.obj_expiration;

					conns.spawn(async move { Self::serve_conn(conn, fwd, cache, expiration).await });
				},
				res = conns.join_next(), if !conns.is_empty() => {
					let res = res.expect("no tasks").expect("task aborted");
					if let Err(err) = res {
						log::warn!("connection terminated: {:?}", err);
					}
				},
			}
		}
	}

	async fn serve_conn(
		conn: quinn::Connecting,
		fwd: FwdTable,
		cache: Cache,
		expiration: Duration,
	) -> anyhow::Result<()> {
		let conn = conn.await.context("failed to establish QUIC connection")?;

		let request = webtransport_quinn::accept(conn)
			.await
			.context("failed to receive WebTransport request")?;

		let path = request.url().path().to_string();
		if path != ENDPOINT_PATH {
			log::warn!("rejecting session for unknown path: {}", path);
			return request
				.close(http::StatusCode::NOT_FOUND)
				.await
				.context("failed to reject session");
		}

		let session = request
			.ok()
			.await
			.context("failed to accept WebTransport session")?;

		log::info!("accepted WebTransport session: path={}", path);

		Connection::new(session, fwd, cache, expiration).serve(&path).await
	}
}
