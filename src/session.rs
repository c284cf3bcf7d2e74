use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Instant;

use thiserror::Error;
use tokio::sync::{mpsc, Mutex};

use crate::message::{Announce, Subscribe, SubscribeError, SubscribeOk};
use crate::setup::{Role, Version};

pub const MAX_PUBLISH_NAMESPACES: usize = 256;
pub const MAX_SUBSCRIBE_TRACKS: usize = 256;

// Deep queues so fan-out rarely blocks; a full queue back-pressures the
// producing session instead of dropping.
const QUEUE_CAPACITY: usize = 1 << 20;

#[derive(Debug, Error)]
pub enum SessionError {
	#[error("too many published namespaces")]
	TooManyNamespaces,

	#[error("too many subscribed tracks")]
	TooManyTracks,

	#[error("unknown namespace: {0}")]
	NamespaceNotFound(String),
}

/// A SUBSCRIBE_OK or SUBSCRIBE_ERROR on its way back to a subscriber.
#[derive(Clone, Debug)]
pub enum SubscribeResponse {
	Ok(SubscribeOk),
	Error(SubscribeError),
}

// The queues carry either traffic or a stop marker, so a stop never
// overtakes items already in flight.
enum Item<T> {
	Forward(T),
	Stop,
}

#[derive(Default)]
struct PendingSubscription {
	track_id: u64,
	expires: u64,

	// False until the publisher's SUBSCRIBE_OK is matched against this entry.
	validated: bool,
}

#[derive(Default)]
struct State {
	// Namespaces this session publishes: namespace -> (track id -> track name).
	namespaces: HashMap<String, HashMap<u64, String>>,

	// Inverse of the above, so object ingest resolves track ids in O(1).
	track_index: HashMap<u64, (String, String)>,

	// Tracks this session subscribed to, keyed "namespace/name".
	tracks: HashMap<String, PendingSubscription>,
}

/// Per-connection MOQT state, shared between the control loop, the worker
/// tasks and the forwarding table.
pub struct Session {
	/// Stable identity for the session's lifetime.
	pub unique_name: String,

	pub created_at: Instant,

	/// Fixed at SETUP.
	pub version: Version,
	pub role: Role,

	state: RwLock<State>,

	subscribe_tx: mpsc::Sender<Item<Subscribe>>,
	subscribe_rx: Mutex<mpsc::Receiver<Item<Subscribe>>>,

	response_tx: mpsc::Sender<Item<SubscribeResponse>>,
	response_rx: Mutex<mpsc::Receiver<Item<SubscribeResponse>>>,

	object_tx: mpsc::Sender<Item<String>>,
	object_rx: Mutex<mpsc::Receiver<Item<String>>>,
}

impl Session {
	pub fn new(unique_name: String, version: Version, role: Role) -> Self {
		let (subscribe_tx, subscribe_rx) = mpsc::channel(QUEUE_CAPACITY);
		let (response_tx, response_rx) = mpsc::channel(QUEUE_CAPACITY);
		let (object_tx, object_rx) = mpsc::channel(QUEUE_CAPACITY);

		Self {
			unique_name,
			created_at: Instant::now(),
			version,
			role,
			state: RwLock::new(State::default()),
			subscribe_tx,
			subscribe_rx: Mutex::new(subscribe_rx),
			response_tx,
			response_rx: Mutex::new(response_rx),
			object_tx,
			object_rx: Mutex::new(object_rx),
		}
	}

	/// Register an announced namespace on this publishing session.
	pub fn add_track_namespace(&self, announce: &Announce) -> Result<(), SessionError> {
		let mut state = self.state.write().unwrap();

		if self.role == Role::Publisher && state.namespaces.len() > MAX_PUBLISH_NAMESPACES {
			return Err(SessionError::TooManyNamespaces);
		}

		state
			.namespaces
			.insert(announce.track_namespace.clone(), HashMap::new());

		Ok(())
	}

	pub fn remove_track_namespace(&self, track_namespace: &str) -> Result<(), SessionError> {
		let mut state = self.state.write().unwrap();

		if state.namespaces.remove(track_namespace).is_none() {
			return Err(SessionError::NamespaceNotFound(track_namespace.to_string()));
		}

		state.track_index.retain(|_, info| info.0 != track_namespace);

		Ok(())
	}

	pub fn has_track_namespace(&self, track_namespace: &str) -> bool {
		self.state.read().unwrap().namespaces.contains_key(track_namespace)
	}

	/// Record the track id assigned by a SUBSCRIBE_OK this publisher answered.
	pub fn add_track_info(
		&self,
		track_namespace: &str,
		track_name: &str,
		track_id: u64,
	) -> Result<(), SessionError> {
		let mut state = self.state.write().unwrap();

		let tracks = state
			.namespaces
			.get_mut(track_namespace)
			.ok_or_else(|| SessionError::NamespaceNotFound(track_namespace.to_string()))?;

		tracks.insert(track_id, track_name.to_string());
		state
			.track_index
			.insert(track_id, (track_namespace.to_string(), track_name.to_string()));

		Ok(())
	}

	/// Resolve a track id to its (namespace, name).
	///
	/// When the id is unknown but the session publishes exactly one
	/// namespace, the object is attributed to it with an empty track name.
	/// That happens for objects that arrive before any SUBSCRIBE_OK assigned
	/// the id a name; an unresolved name further down the pipeline points at
	/// a misbehaving upstream.
	pub fn get_track_info(&self, track_id: u64) -> Option<(String, String)> {
		let state = self.state.read().unwrap();

		if let Some(info) = state.track_index.get(&track_id) {
			return Some(info.clone());
		}

		if state.namespaces.len() == 1 {
			let namespace = state.namespaces.keys().next().unwrap().clone();
			log::warn!(
				"{} - track {} has no name yet, attributing to namespace {}",
				self.unique_name,
				track_id,
				namespace
			);
			return Some((namespace, String::new()));
		}

		None
	}

	/// Whether this session subscribed to the track a cache key belongs to.
	pub fn needs_forward(&self, cache_key: &str) -> bool {
		// Cache key layout: namespace/name/group/object.
		let mut parts = cache_key.split('/');
		let (Some(namespace), Some(name)) = (parts.next(), parts.next()) else {
			return false;
		};

		let key = format!("{}/{}", namespace, name);
		self.state.read().unwrap().tracks.contains_key(&key)
	}

	/// Record a SUBSCRIBE this session sent, pending the publisher's answer.
	pub fn add_subscribe_request(&self, subscribe: &Subscribe) -> Result<(), SessionError> {
		let mut state = self.state.write().unwrap();

		if self.role == Role::Subscriber && state.tracks.len() > MAX_SUBSCRIBE_TRACKS {
			return Err(SessionError::TooManyTracks);
		}

		let key = format!("{}/{}", subscribe.track_namespace, subscribe.track_name);
		state.tracks.insert(key, PendingSubscription::default());

		Ok(())
	}

	/// Mark a pending subscription validated, returning whether this call won.
	pub fn validate_pending_subscription(
		&self,
		track_namespace: &str,
		track_name: &str,
		track_id: u64,
		expires: u64,
	) -> bool {
		let mut state = self.state.write().unwrap();

		let key = format!("{}/{}", track_namespace, track_name);
		match state.tracks.get_mut(&key) {
			Some(pending) if !pending.validated => {
				pending.validated = true;
				pending.track_id = track_id;
				pending.expires = expires;
				true
			}
			_ => false,
		}
	}

	/// Drop a pending subscription, returning whether it existed.
	pub fn delete_pending_subscription(&self, track_namespace: &str, track_name: &str) -> bool {
		let mut state = self.state.write().unwrap();

		let key = format!("{}/{}", track_namespace, track_name);
		state.tracks.remove(&key).is_some()
	}

	pub async fn forward_subscribe(&self, subscribe: Subscribe) {
		self.subscribe_tx.send(Item::Forward(subscribe)).await.ok();
	}

	pub async fn forward_subscribe_ok(&self, ok: SubscribeOk) {
		self.response_tx
			.send(Item::Forward(SubscribeResponse::Ok(ok)))
			.await
			.ok();
	}

	pub async fn forward_subscribe_error(&self, error: SubscribeError) {
		self.response_tx
			.send(Item::Forward(SubscribeResponse::Error(error)))
			.await
			.ok();
	}

	pub async fn received_object(&self, cache_key: String) {
		self.object_tx.send(Item::Forward(cache_key)).await.ok();
	}

	/// The next SUBSCRIBE to write upstream; `None` means stop.
	pub async fn next_subscribe(&self) -> Option<Subscribe> {
		let mut rx = self.subscribe_rx.lock().await;
		match rx.recv().await {
			Some(Item::Forward(subscribe)) => Some(subscribe),
			Some(Item::Stop) | None => None,
		}
	}

	/// The next subscribe response to write back; `None` means stop.
	pub async fn next_subscribe_response(&self) -> Option<SubscribeResponse> {
		let mut rx = self.response_rx.lock().await;
		match rx.recv().await {
			Some(Item::Forward(response)) => Some(response),
			Some(Item::Stop) | None => None,
		}
	}

	/// The next cache key to relay; `None` means stop.
	pub async fn next_object_key(&self) -> Option<String> {
		let mut rx = self.object_rx.lock().await;
		match rx.recv().await {
			Some(Item::Forward(key)) => Some(key),
			Some(Item::Stop) | None => None,
		}
	}

	/// Push a stop marker through every queue so the workers drain and exit.
	pub async fn stop_workers(&self) {
		self.object_tx.send(Item::Stop).await.ok();
		self.subscribe_tx.send(Item::Stop).await.ok();
		self.response_tx.send(Item::Stop).await.ok();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::message::Location;

	fn announce(namespace: &str) -> Announce {
		Announce {
			track_namespace: namespace.to_string(),
			auth_info: String::new(),
		}
	}

	fn subscribe(namespace: &str, name: &str) -> Subscribe {
		Subscribe {
			track_namespace: namespace.to_string(),
			track_name: name.to_string(),
			start_group: Location::None,
			start_object: Location::None,
			end_group: Location::None,
			end_object: Location::None,
			auth_info: String::new(),
		}
	}

	fn session(role: Role) -> Session {
		Session::new("test/1234".to_string(), Version::DRAFT_01, role)
	}

	#[tokio::test]
	async fn namespaces() {
		let session = session(Role::Publisher);

		session.add_track_namespace(&announce("chat")).unwrap();
		assert!(session.has_track_namespace("chat"));
		assert!(!session.has_track_namespace("video"));

		session.remove_track_namespace("chat").unwrap();
		assert!(!session.has_track_namespace("chat"));

		assert!(matches!(
			session.remove_track_namespace("chat"),
			Err(SessionError::NamespaceNotFound(_))
		));
	}

	#[tokio::test]
	async fn track_info() {
		let session = session(Role::Publisher);
		session.add_track_namespace(&announce("chat")).unwrap();
		session.add_track_namespace(&announce("video")).unwrap();

		assert!(matches!(
			session.add_track_info("missing", "main", 7),
			Err(SessionError::NamespaceNotFound(_))
		));

		session.add_track_info("chat", "main", 7).unwrap();
		assert_eq!(
			session.get_track_info(7),
			Some(("chat".to_string(), "main".to_string()))
		);

		// Two namespaces and an unknown id: no way to attribute the object.
		assert_eq!(session.get_track_info(8), None);

		// Removing the namespace also drops its ids from the index.
		session.remove_track_namespace("chat").unwrap();
		assert_eq!(session.get_track_info(7), None);
	}

	#[tokio::test]
	async fn track_info_sole_namespace() {
		let session = session(Role::Publisher);
		session.add_track_namespace(&announce("chat")).unwrap();

		// An unknown id under a single namespace resolves with an empty name.
		assert_eq!(
			session.get_track_info(42),
			Some(("chat".to_string(), String::new()))
		);
	}

	#[tokio::test]
	async fn needs_forward() {
		let session = session(Role::Subscriber);
		session.add_subscribe_request(&subscribe("ns", "track")).unwrap();

		assert!(session.needs_forward("ns/track/5/2"));
		assert!(!session.needs_forward("ns/other/5/2"));
		assert!(!session.needs_forward("ns"));
	}

	#[tokio::test]
	async fn pending_subscriptions() {
		let session = session(Role::Subscriber);
		session.add_subscribe_request(&subscribe("ns", "track")).unwrap();

		// The first matching SUBSCRIBE_OK wins; a second one does not.
		assert!(session.validate_pending_subscription("ns", "track", 7, 0));
		assert!(!session.validate_pending_subscription("ns", "track", 8, 0));

		assert!(session.delete_pending_subscription("ns", "track"));
		assert!(!session.delete_pending_subscription("ns", "track"));
	}

	#[tokio::test]
	async fn queue_stop() {
		let session = session(Role::Both);

		session.forward_subscribe(subscribe("ns", "track")).await;
		session.received_object("ns/track/0/0".to_string()).await;
		session.stop_workers().await;

		// Items already queued drain before the stop marker.
		assert!(session.next_subscribe().await.is_some());
		assert!(session.next_subscribe().await.is_none());

		assert_eq!(session.next_object_key().await.as_deref(), Some("ns/track/0/0"));
		assert!(session.next_object_key().await.is_none());

		assert!(session.next_subscribe_response().await.is_none());
	}
}
