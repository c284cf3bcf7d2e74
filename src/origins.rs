use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;
use url::Url;
use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::cache::Cache;
use crate::config::Config;
use crate::connection::Connection;
use crate::fwdtable::FwdTable;
use crate::tls::Tls;

/// How long to wait before redialing a lost origin.
pub const RECONNECT_DELAY: Duration = Duration::from_millis(3000);

/// One upstream content origin from the JSON config.
#[derive(Clone, Debug, Deserialize)]
pub struct Origin {
	#[serde(rename = "friendlyname")]
	pub friendly_name: String,

	pub guid: String,

	#[serde(rename = "tracknamespace")]
	pub track_namespace: String,

	#[serde(rename = "authinfo")]
	pub auth_info: String,

	#[serde(rename = "originaddress")]
	pub origin_address: String,

	/// Extra CA certificate to trust, relative to the config file.
	#[serde(rename = "origincertpath", default)]
	pub origin_cert_path: String,
}

#[derive(Debug, Deserialize)]
struct OriginsFile {
	origins: Vec<Origin>,
}

/// The upstream origin sessions, each kept alive by its own task.
pub struct Origins {
	shutdown: watch::Sender<bool>,
	tasks: JoinSet<()>,
}

impl Origins {
	/// Read the config and start a supervision task per origin.
	///
	/// A missing or malformed config is logged and treated as empty, so the
	/// relay still serves local publishers.
	pub fn load(config: &Config, tls: &Tls, fwd: FwdTable, cache: Cache) -> Self {
		let (shutdown, stopped) = watch::channel(false);
		let mut tasks = JoinSet::new();

		match Self::parse(&config.moq_origins_config, tls) {
			Ok(origins) => {
				for (origin, endpoint) in origins {
					tasks.spawn(run_origin(
						origin,
						endpoint,
						stopped.clone(),
						fwd.clone(),
						cache.clone(),
						Duration::from_millis(config.obj_exp_ms),
					));
				}
			}
			Err(err) => log::error!(
				"failed to load origins config {}: {:?}",
				config.moq_origins_config.display(),
				err
			),
		}

		Self { shutdown, tasks }
	}

	fn parse(path: &Path, tls: &Tls) -> anyhow::Result<Vec<(Origin, quinn::Endpoint)>> {
		let data = std::fs::read(path).context("failed to read origins config")?;
		let file: OriginsFile = serde_json::from_slice(&data).context("failed to parse origins config")?;

		let dir = path.parent().unwrap_or_else(|| Path::new("."));
		let mut origins = Vec::new();

		for origin in file.origins {
			let extra = match origin.origin_cert_path.as_str() {
				"" => None,
				cert => Some(
					std::fs::read(dir.join(cert))
						.with_context(|| format!("failed to read origin cert {}", cert))?,
				),
			};

			let endpoint = client_endpoint(tls.client(extra.as_deref())?)?;
			origins.push((origin, endpoint));
		}

		Ok(origins)
	}

	/// Signal every origin task to stop, then wait for them to exit.
	pub async fn close(mut self) {
		self.shutdown.send(true).ok();
		while self.tasks.join_next().await.is_some() {}
	}
}

fn client_endpoint(tls: rustls::ClientConfig) -> anyhow::Result<quinn::Endpoint> {
	let mut endpoint = quinn::Endpoint::client("[::]:0".parse()?)?;
	endpoint.set_default_client_config(quinn::ClientConfig::new(Arc::new(tls)));
	Ok(endpoint)
}

async fn run_origin(
	origin: Origin,
	endpoint: quinn::Endpoint,
	mut stopped: watch::Receiver<bool>,
	fwd: FwdTable,
	cache: Cache,
	obj_expiration: Duration,
) {
	let uri: Url = match origin.origin_address.parse() {
		Ok(uri) => uri,
		Err(err) => {
			log::error!(
				"{} - invalid origin address {}: {}",
				origin.friendly_name,
				origin.origin_address,
				err
			);
			return;
		}
	};

	loop {
		let attempt = async {
			let session = webtransport_quinn::connect(&endpoint, &uri)
				.await
				.context("failed to establish WebTransport session")?;

			log::info!("{} - connected to origin: {}", origin.friendly_name, uri);

			Connection::new(session, fwd.clone(), cache.clone(), obj_expiration)
				.dial(&origin.friendly_name, &origin.track_namespace, &origin.auth_info)
				.await
		};

		tokio::select! {
			res = attempt => {
				if let Err(err) = res {
					log::warn!("{} - origin session failed: {:?}", origin.friendly_name, err);
				}
			},
			_ = stopped.changed() => break,
		}

		// Redial after a delay, unless we're shutting down.
		tokio::select! {
			_ = tokio::time::sleep(RECONNECT_DELAY) => {},
			_ = stopped.changed() => break,
		}
	}

	log::info!("{} - origin task exited", origin.friendly_name);
}
