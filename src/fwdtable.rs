use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::RwLock;

use crate::message::{Subscribe, SubscribeError, SubscribeOk};
use crate::session::Session;
use crate::setup::Role;

#[derive(Debug, Error)]
pub enum RouteError {
	#[error("duplicate session: {0}")]
	DuplicateSession(String),

	#[error("unknown session: {0}")]
	SessionNotFound(String),

	#[error("no publishers for namespace: {0}")]
	NoPublishers(String),

	#[error("no matching subscribers for track: {0}")]
	NoMatchingSubscribers(String),
}

/// The process-wide registry routing between sessions.
///
/// Reads (the fan-out paths) take a shared lock; only session add/remove
/// takes it exclusively. The lock is async because fan-out pushes onto
/// bounded queues while holding it.
#[derive(Clone, Default)]
pub struct FwdTable {
	sessions: Arc<RwLock<HashMap<String, Arc<Session>>>>,
}

impl FwdTable {
	pub fn new() -> Self {
		Default::default()
	}

	pub async fn add_session(&self, session: Arc<Session>) -> Result<(), RouteError> {
		let mut sessions = self.sessions.write().await;

		if sessions.contains_key(&session.unique_name) {
			return Err(RouteError::DuplicateSession(session.unique_name.clone()));
		}

		sessions.insert(session.unique_name.clone(), session);
		Ok(())
	}

	/// Remove a session and stop its workers.
	pub async fn remove_session(&self, unique_name: &str) -> Result<(), RouteError> {
		let session = self
			.sessions
			.write()
			.await
			.remove(unique_name)
			.ok_or_else(|| RouteError::SessionNotFound(unique_name.to_string()))?;

		session.stop_workers().await;
		Ok(())
	}

	/// Tell every subscribed session that a new object landed in the cache.
	pub async fn received_object(&self, cache_key: &str) {
		let sessions = self.sessions.read().await;

		for session in sessions.values() {
			if session.role.is_subscriber() && session.needs_forward(cache_key) {
				session.received_object(cache_key.to_string()).await;
			}
		}
	}

	/// Route a SUBSCRIBE to every publisher of the namespace.
	///
	/// Pure publishers are preferred; relay (Both) sessions are only used
	/// when no local publisher holds the namespace.
	pub async fn forward_subscribe(&self, subscribe: &Subscribe) -> Result<(), RouteError> {
		let sessions = self.sessions.read().await;
		let mut any = false;

		for session in sessions.values() {
			if session.role == Role::Publisher
				&& session.has_track_namespace(&subscribe.track_namespace)
			{
				session.forward_subscribe(subscribe.clone()).await;
				any = true;
			}
		}

		if !any {
			for session in sessions.values() {
				if session.role == Role::Both
					&& session.has_track_namespace(&subscribe.track_namespace)
				{
					session.forward_subscribe(subscribe.clone()).await;
					any = true;
				}
			}
		}

		if !any {
			return Err(RouteError::NoPublishers(subscribe.track_namespace.clone()));
		}

		Ok(())
	}

	/// Route a SUBSCRIBE_OK to every session with a matching pending request.
	pub async fn forward_subscribe_ok(&self, ok: &SubscribeOk) -> Result<(), RouteError> {
		let sessions = self.sessions.read().await;
		let mut matched = 0usize;

		for session in sessions.values() {
			if session.role.is_subscriber()
				&& session.validate_pending_subscription(
					&ok.track_namespace,
					&ok.track_name,
					ok.track_id.into_inner(),
					ok.expires.into_inner(),
				) {
				session.forward_subscribe_ok(ok.clone()).await;
				matched += 1;
			}
		}

		if matched > 1 {
			// SUBSCRIBE_OK carries no subscriber correlator, so concurrent
			// pending requests for the same track can not be told apart.
			log::warn!(
				"SUBSCRIBE_OK matched {} pending subscriptions for {}/{}",
				matched,
				ok.track_namespace,
				ok.track_name
			);
		}

		if matched == 0 {
			return Err(RouteError::NoMatchingSubscribers(format!(
				"{}/{}",
				ok.track_namespace, ok.track_name
			)));
		}

		Ok(())
	}

	/// Route a SUBSCRIBE_ERROR, dropping the matching pending requests.
	pub async fn forward_subscribe_error(&self, error: &SubscribeError) -> Result<(), RouteError> {
		let sessions = self.sessions.read().await;
		let mut any = false;

		for session in sessions.values() {
			if session.role.is_subscriber()
				&& session.delete_pending_subscription(&error.track_namespace, &error.track_name)
			{
				session.forward_subscribe_error(error.clone()).await;
				any = true;
			}
		}

		if !any {
			return Err(RouteError::NoMatchingSubscribers(format!(
				"{}/{}",
				error.track_namespace, error.track_name
			)));
		}

		Ok(())
	}
}
