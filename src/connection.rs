use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::cache::{Cache, Object};
use crate::coding::{DecodeError, EncodeError};
use crate::error::{ErrorCode, Terminate};
use crate::fwdtable::FwdTable;
use crate::message::{self, Announce, AnnounceError, AnnounceOk, Message, SubscribeError, Unannounce};
use crate::session::{Session, SubscribeResponse};
use crate::setup::{self, Role, Version};
use crate::transport::Transport;

/// Drives a single WebTransport session through SETUP, the control loop and
/// the per-role worker tasks.
pub struct Connection<T: Transport> {
	transport: Arc<T>,
	fwd: FwdTable,
	cache: Cache,

	// TTL applied to every object this session contributes.
	obj_expiration: Duration,
}

impl<T: Transport> Connection<T> {
	pub fn new(transport: T, fwd: FwdTable, cache: Cache, obj_expiration: Duration) -> Self {
		Self {
			transport: Arc::new(transport),
			fwd,
			cache,
			obj_expiration,
		}
	}

	/// Run an accepted session: the peer sends CLIENT_SETUP and we answer.
	pub async fn serve(self, namespace: &str) -> anyhow::Result<()> {
		let (mut send, mut recv) = self
			.transport
			.accept_bi()
			.await
			.context("failed to accept control stream")?;

		let client = match setup::Client::decode(&mut recv).await {
			Ok(client) => client,
			Err(err) => {
				return Err(self.terminate(Terminate::new(
					ErrorCode::ProtocolViolation,
					format!("failed to read client SETUP: {}", err),
				)))
			}
		};
		log::info!("{} - received client SETUP: {:?}", namespace, client);

		let Some(role) = client.role else {
			return Err(self.terminate(Terminate::new(
				ErrorCode::ProtocolViolation,
				"client SETUP is missing a role",
			)));
		};

		if !client.versions.contains(&Version::SUPPORTED) {
			return Err(self.terminate(Terminate::new(
				ErrorCode::ProtocolViolation,
				format!("no supported version offered: {:?}", client.versions),
			)));
		}

		let server = setup::Server {
			version: Version::SUPPORTED,
			role: role.invert(),
		};

		if let Err(err) = server.encode(&mut send).await {
			return Err(self.terminate(Terminate::new(
				ErrorCode::ProtocolViolation,
				format!("failed to send server SETUP: {}", err),
			)));
		}
		log::info!("{} - sent server SETUP: {:?}", namespace, server);

		let session = Arc::new(Session::new(
			format!("{}/{}", namespace, Uuid::new_v4()),
			Version::SUPPORTED,
			role,
		));

		self.run(send, recv, session).await
	}

	/// Run a dialed session towards an upstream origin, acting as a relay.
	pub async fn dial(
		self,
		namespace: &str,
		track_namespace: &str,
		auth_info: &str,
	) -> anyhow::Result<()> {
		let (mut send, mut recv) = self
			.transport
			.open_bi()
			.await
			.context("failed to open control stream")?;

		let client = setup::Client {
			versions: [Version::SUPPORTED].into(),
			role: Some(Role::Both),
		};

		if let Err(err) = client.encode(&mut send).await {
			return Err(self.terminate(Terminate::new(
				ErrorCode::ProtocolViolation,
				format!("failed to send client SETUP: {}", err),
			)));
		}
		log::info!("{} - sent client SETUP: {:?}", namespace, client);

		let server = match setup::Server::decode(&mut recv).await {
			Ok(server) => server,
			Err(err) => {
				return Err(self.terminate(Terminate::new(
					ErrorCode::ProtocolViolation,
					format!("failed to read server SETUP: {}", err),
				)))
			}
		};
		log::info!("{} - received server SETUP: {:?}", namespace, server);

		if server.role != Role::Both {
			return Err(self.terminate(Terminate::new(
				ErrorCode::ProtocolViolation,
				format!("origin negotiated role {:?}, expected both", server.role),
			)));
		}

		if server.version != Version::SUPPORTED {
			return Err(self.terminate(Terminate::new(
				ErrorCode::ProtocolViolation,
				format!("origin negotiated version {:?}", server.version),
			)));
		}

		let session = Arc::new(Session::new(
			format!("{}/{}", namespace, Uuid::new_v4()),
			server.version,
			Role::Both,
		));

		// The upstream namespace comes from configuration, not a wire
		// ANNOUNCE, so register it directly.
		let announce = Announce {
			track_namespace: track_namespace.to_string(),
			auth_info: auth_info.to_string(),
		};
		if let Err(err) = session.add_track_namespace(&announce) {
			log::error!("{} - failed to register origin namespace: {}", session.unique_name, err);
		}

		self.run(send, recv, session).await
	}

	async fn run(
		self,
		send: T::SendStream,
		mut recv: T::RecvStream,
		session: Arc<Session>,
	) -> anyhow::Result<()> {
		if let Err(err) = self.fwd.add_session(session.clone()).await {
			log::error!("{} - failed to register session: {}", session.unique_name, err);
			return Err(self.terminate(Terminate::new(ErrorCode::Generic, "failed to register session")));
		}

		log::info!(
			"{} - session created: role={:?} version={:?}",
			session.unique_name,
			session.role,
			session.version
		);

		let control = ControlSend::new(send);

		// The workers exit on the stop marker pushed during session removal,
		// or when their underlying stream fails.
		if session.role.is_publisher() {
			tokio::spawn(run_object_ingest(
				self.transport.clone(),
				session.clone(),
				self.fwd.clone(),
				self.cache.clone(),
				self.obj_expiration,
			));
			tokio::spawn(run_subscribe_forward(control.clone(), session.clone()));
		}
		if session.role.is_subscriber() {
			tokio::spawn(run_object_forward(
				self.transport.clone(),
				session.clone(),
				self.cache.clone(),
			));
			tokio::spawn(run_response_forward(control.clone(), session.clone()));
		}

		let result = self.run_control(&mut recv, &control, &session).await;

		if let Err(err) = self.fwd.remove_session(&session.unique_name).await {
			log::error!("{} - failed to remove session: {}", session.unique_name, err);
		}

		match result {
			Ok(()) => Ok(()),
			Err(terminate) => Err(self.terminate(terminate)),
		}
	}

	// Close the transport and surface the reason to the caller's log.
	fn terminate(&self, terminate: Terminate) -> anyhow::Error {
		self.transport.close(terminate.code.code(), &terminate.reason);
		terminate.into()
	}

	async fn run_control(
		&self,
		recv: &mut T::RecvStream,
		control: &ControlSend<T::SendStream>,
		session: &Arc<Session>,
	) -> Result<(), Terminate> {
		loop {
			let msg = match Message::decode(recv).await {
				Ok(msg) => msg,
				Err(DecodeError::Final) => {
					log::info!("{} - control stream closed", session.unique_name);
					return Ok(());
				}
				Err(DecodeError::IoError(err)) => {
					log::info!("{} - control stream failed: {}", session.unique_name, err);
					return Ok(());
				}
				Err(err) => {
					return Err(Terminate::new(
						ErrorCode::ProtocolViolation,
						format!("failed to decode control message: {}", err),
					));
				}
			};

			log::info!("{} - received message: {:?}", session.unique_name, msg);

			match msg {
				Message::Announce(msg) => self.process_announce(msg, control, session).await?,
				Message::AnnounceOk(msg) => {
					if session.role != Role::Publisher {
						return Err(Terminate::new(
							ErrorCode::ProtocolViolation,
							"ANNOUNCE_OK from a non-publisher",
						));
					}
					log::info!("{} - announce acknowledged: {}", session.unique_name, msg.track_namespace);
				}
				Message::AnnounceError(msg) => {
					// We never announced to this peer; tolerated for forward compatibility.
					log::warn!(
						"{} - unexpected ANNOUNCE_ERROR({}): {}",
						session.unique_name,
						msg.code,
						msg.reason
					);
				}
				Message::Unannounce(msg) => self.process_unannounce(msg, session)?,
				Message::Subscribe(msg) => self.process_subscribe(msg, control, session).await?,
				Message::SubscribeOk(msg) => self.process_subscribe_ok(msg, session).await?,
				Message::SubscribeError(msg) => self.process_subscribe_error(msg, session).await?,
			}
		}
	}

	async fn process_announce(
		&self,
		msg: Announce,
		control: &ControlSend<T::SendStream>,
		session: &Arc<Session>,
	) -> Result<(), Terminate> {
		if session.role != Role::Publisher {
			return Err(Terminate::new(
				ErrorCode::ProtocolViolation,
				"ANNOUNCE from a non-publisher",
			));
		}

		let response: Message = match session.add_track_namespace(&msg) {
			Ok(()) => AnnounceOk {
				track_namespace: msg.track_namespace,
			}
			.into(),
			Err(err) => {
				log::error!("{} - failed to add namespace: {}", session.unique_name, err);
				AnnounceError {
					track_namespace: msg.track_namespace,
					code: AnnounceError::ADDING_TRACK,
					reason: err.to_string(),
				}
				.into()
			}
		};

		control.send(response).await.map_err(|err| {
			Terminate::new(
				ErrorCode::Generic,
				format!("failed to send ANNOUNCE response: {}", err),
			)
		})
	}

	fn process_unannounce(&self, msg: Unannounce, session: &Arc<Session>) -> Result<(), Terminate> {
		if session.role != Role::Publisher {
			return Err(Terminate::new(
				ErrorCode::ProtocolViolation,
				"UNANNOUNCE from a non-publisher",
			));
		}

		if let Err(err) = session.remove_track_namespace(&msg.track_namespace) {
			log::error!("{} - failed to remove namespace: {}", session.unique_name, err);
		}

		Ok(())
	}

	async fn process_subscribe(
		&self,
		msg: message::Subscribe,
		control: &ControlSend<T::SendStream>,
		session: &Arc<Session>,
	) -> Result<(), Terminate> {
		if !session.role.is_subscriber() {
			return Err(Terminate::new(
				ErrorCode::ProtocolViolation,
				"SUBSCRIBE from a non-subscriber",
			));
		}

		let mut error = None;

		if let Err(err) = session.add_subscribe_request(&msg) {
			log::error!("{} - failed to add subscription: {}", session.unique_name, err);
			error = Some(SubscribeError {
				track_namespace: msg.track_namespace.clone(),
				track_name: msg.track_name.clone(),
				code: SubscribeError::ADDING_TRACK,
				reason: err.to_string(),
			});
		}

		if error.is_none() {
			if let Err(err) = self.fwd.forward_subscribe(&msg).await {
				error = Some(SubscribeError {
					track_namespace: msg.track_namespace.clone(),
					track_name: msg.track_name.clone(),
					code: SubscribeError::NO_PUBLISHERS,
					reason: err.to_string(),
				});
			}
		}

		if let Some(error) = error {
			log::info!("{} - rejecting subscribe: {}", session.unique_name, error.reason);
			control.send(error.into()).await.map_err(|err| {
				Terminate::new(
					ErrorCode::Generic,
					format!("failed to send SUBSCRIBE_ERROR: {}", err),
				)
			})?;
		}

		Ok(())
	}

	async fn process_subscribe_ok(
		&self,
		msg: message::SubscribeOk,
		session: &Arc<Session>,
	) -> Result<(), Terminate> {
		if !session.role.is_publisher() {
			return Err(Terminate::new(
				ErrorCode::ProtocolViolation,
				"SUBSCRIBE_OK from a non-publisher",
			));
		}

		// Record the id before forwarding, so an object using it right away
		// resolves to the full track name.
		session
			.add_track_info(&msg.track_namespace, &msg.track_name, msg.track_id.into_inner())
			.map_err(|err| {
				Terminate::new(
					ErrorCode::Generic,
					format!("failed to record track info: {}", err),
				)
			})?;

		if let Err(err) = self.fwd.forward_subscribe_ok(&msg).await {
			// Nobody is waiting on this track any more; not fatal.
			log::warn!("{} - dropping SUBSCRIBE_OK: {}", session.unique_name, err);
		}

		Ok(())
	}

	async fn process_subscribe_error(
		&self,
		msg: message::SubscribeError,
		session: &Arc<Session>,
	) -> Result<(), Terminate> {
		if !session.role.is_publisher() {
			return Err(Terminate::new(
				ErrorCode::ProtocolViolation,
				"SUBSCRIBE_ERROR from a non-publisher",
			));
		}

		if let Err(err) = self.fwd.forward_subscribe_error(&msg).await {
			log::warn!("{} - dropping SUBSCRIBE_ERROR: {}", session.unique_name, err);
		}

		Ok(())
	}
}

// A helper to guard the shared control stream behind a mutex: the control
// loop and both forwarding workers write to it.
pub(crate) struct ControlSend<S> {
	stream: Arc<Mutex<S>>,
}

impl<S: tokio::io::AsyncWrite + Unpin + Send> ControlSend<S> {
	fn new(stream: S) -> Self {
		Self {
			stream: Arc::new(Mutex::new(stream)),
		}
	}

	pub async fn send(&self, msg: Message) -> Result<(), EncodeError> {
		let mut stream = self.stream.lock().await;
		log::info!("sending message: {:?}", msg);
		msg.encode(&mut *stream).await?;
		stream.flush().await?;
		Ok(())
	}
}

impl<S> Clone for ControlSend<S> {
	fn clone(&self) -> Self {
		Self {
			stream: self.stream.clone(),
		}
	}
}

// Accept unidirectional streams and decode one OBJECT from each.
async fn run_object_ingest<T: Transport>(
	transport: Arc<T>,
	session: Arc<Session>,
	fwd: FwdTable,
	cache: Cache,
	expiration: Duration,
) {
	loop {
		let stream = match transport.accept_uni().await {
			Ok(stream) => stream,
			Err(err) => {
				log::info!("{} - no longer accepting object streams: {}", session.unique_name, err);
				break;
			}
		};

		// Decode and drain concurrently so one slow stream can't stall the rest.
		let session = session.clone();
		let fwd = fwd.clone();
		let cache = cache.clone();

		tokio::spawn(async move {
			if let Err(err) = recv_object(stream, &session, &fwd, &cache, expiration).await {
				log::error!("{} - failed to receive object: {:?}", session.unique_name, err);
			}
		});
	}

	log::info!("{} - object ingest exited", session.unique_name);
}

async fn recv_object<R: tokio::io::AsyncRead + Unpin + Send>(
	mut stream: R,
	session: &Session,
	fwd: &FwdTable,
	cache: &Cache,
	expiration: Duration,
) -> anyhow::Result<()> {
	let header = match message::Object::decode(&mut stream).await {
		Ok(header) => header,
		// A stream closed without a message is ignored.
		Err(DecodeError::Final) => return Ok(()),
		Err(err) => return Err(err.into()),
	};

	let (track_namespace, track_name) = session
		.get_track_info(header.track_id.into_inner())
		.with_context(|| format!("track {} is not published by this session", header.track_id))?;

	let key = format!(
		"{}/{}/{}/{}",
		track_namespace, track_name, header.group_sequence, header.object_sequence
	);

	let object = cache.create(&key, header, expiration)?;
	log::info!("{} - receiving object: {}", session.unique_name, key);

	// Notify before the payload finishes so subscribers can start relaying
	// the prefix immediately.
	fwd.received_object(&key).await;

	let mut buf = [0u8; 32 * 1024];
	loop {
		let n = stream.read(&mut buf).await?;
		if n == 0 {
			break;
		}
		object.write_payload(&buf[..n]);
	}
	object.set_eof();

	log::info!(
		"{} - received object: {} ({} bytes)",
		session.unique_name,
		key,
		object.len()
	);

	Ok(())
}

// Write queued SUBSCRIBEs to the publisher on the control stream.
async fn run_subscribe_forward<S: tokio::io::AsyncWrite + Unpin + Send>(
	control: ControlSend<S>,
	session: Arc<Session>,
) {
	while let Some(subscribe) = session.next_subscribe().await {
		if let Err(err) = control.send(subscribe.into()).await {
			log::error!("{} - failed to forward SUBSCRIBE: {}", session.unique_name, err);
		}
	}

	log::info!("{} - subscribe forwarding exited", session.unique_name);
}

// Write queued SUBSCRIBE_OK / SUBSCRIBE_ERROR back to the subscriber.
async fn run_response_forward<S: tokio::io::AsyncWrite + Unpin + Send>(
	control: ControlSend<S>,
	session: Arc<Session>,
) {
	while let Some(response) = session.next_subscribe_response().await {
		let msg = match response {
			SubscribeResponse::Ok(ok) => Message::SubscribeOk(ok),
			SubscribeResponse::Error(error) => Message::SubscribeError(error),
		};

		if let Err(err) = control.send(msg).await {
			log::error!("{} - failed to forward subscribe response: {}", session.unique_name, err);
		}
	}

	log::info!("{} - response forwarding exited", session.unique_name);
}

// Open a unidirectional stream per cache key and replay the object.
async fn run_object_forward<T: Transport>(transport: Arc<T>, session: Arc<Session>, cache: Cache) {
	while let Some(key) = session.next_object_key().await {
		let Some(object) = cache.get(&key) else {
			log::error!("{} - object missing from cache: {}", session.unique_name, key);
			continue;
		};

		let transport = transport.clone();
		let session = session.clone();

		tokio::spawn(async move {
			match send_object(transport.as_ref(), object).await {
				Ok(()) => log::info!("{} - sent object: {}", session.unique_name, key),
				Err(err) => {
					log::error!("{} - failed to send object {}: {:?}", session.unique_name, key, err)
				}
			}
		});
	}

	log::info!("{} - object forwarding exited", session.unique_name);
}

async fn send_object<T: Transport>(transport: &T, object: Arc<Object>) -> anyhow::Result<()> {
	let mut stream = transport.open_uni().await?;

	object.header.encode(&mut stream).await?;

	let mut reader = object.reader();
	let mut buf = [0u8; 32 * 1024];
	loop {
		let n = reader.read(&mut buf).await;
		if n == 0 {
			break;
		}
		stream.write_all(&buf[..n]).await?;
	}

	// Flush and FIN the stream.
	stream.shutdown().await?;

	Ok(())
}
