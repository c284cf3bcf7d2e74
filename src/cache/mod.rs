mod object;

pub use object::*;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;

use crate::message;

#[derive(Clone, Debug, Error)]
pub enum CacheError {
	/// The keyed entry is still receiving payload and can not be replaced.
	#[error("can not overwrite an open object")]
	OverwriteOpenObject,
}

/// The in-memory object store shared by every session.
///
/// Entries live until a sweep finds them complete and past their TTL.
#[derive(Clone)]
pub struct Cache {
	inner: Arc<Inner>,
}

struct Inner {
	objects: RwLock<HashMap<String, Arc<Object>>>,

	// Present while the sweeper is running.
	sweeper: Mutex<Option<Sweeper>>,
}

struct Sweeper {
	stop: oneshot::Sender<()>,
	task: JoinHandle<()>,
}

impl Cache {
	/// Create the cache, starting the sweeper iff the period is non-zero.
	pub fn new(cleanup_period: Duration) -> Self {
		let cache = Self {
			inner: Arc::new(Inner {
				objects: RwLock::new(HashMap::new()),
				sweeper: Mutex::new(None),
			}),
		};

		if !cleanup_period.is_zero() {
			let (stop, mut stopped) = oneshot::channel();
			let handle = cache.clone();

			let task = tokio::spawn(async move {
				let mut timer = tokio::time::interval(cleanup_period);

				loop {
					tokio::select! {
						_ = timer.tick() => handle.sweep(Instant::now()),
						_ = &mut stopped => break,
					}
				}

				log::info!("cache sweeper exited");
			});

			*cache.inner.sweeper.try_lock().expect("sweeper lock contended at startup") =
				Some(Sweeper { stop, task });

			log::info!("started cache sweeper: period={:?}", cleanup_period);
		}

		cache
	}

	/// Create a new object for the key, replacing any completed entry.
	pub fn create(
		&self,
		key: &str,
		header: message::Object,
		max_age: Duration,
	) -> Result<Arc<Object>, CacheError> {
		let mut objects = self.inner.objects.write().unwrap();

		if let Some(existing) = objects.get(key) {
			if !existing.is_eof() {
				return Err(CacheError::OverwriteOpenObject);
			}
		}

		let object = Arc::new(Object::new(header, max_age));
		objects.insert(key.to_string(), object.clone());

		Ok(object)
	}

	pub fn get(&self, key: &str) -> Option<Arc<Object>> {
		self.inner.objects.read().unwrap().get(key).cloned()
	}

	/// Stop the sweeper and wait for it to acknowledge. Safe to call twice.
	pub async fn stop(&self) {
		if let Some(sweeper) = self.inner.sweeper.lock().await.take() {
			drop(sweeper.stop);
			sweeper.task.await.ok();
		}
	}

	// Remove every completed entry that outlived its TTL.
	// Entries still receiving payload are left alone.
	fn sweep(&self, now: Instant) {
		let mut objects = self.inner.objects.write().unwrap();
		let before = objects.len();

		objects.retain(|key, object| {
			let expired = object.is_eof() && object.received_at + object.max_age < now;
			if expired {
				log::info!("removed expired object: {}", key);
			}
			!expired
		});

		log::debug!("cache sweep finished: before={} after={}", before, objects.len());
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::coding::VarInt;

	fn header(track_id: u32) -> message::Object {
		message::Object {
			track_id: VarInt::from_u32(track_id),
			group_sequence: VarInt::ZERO,
			object_sequence: VarInt::ZERO,
			send_order: VarInt::ZERO,
		}
	}

	#[tokio::test]
	async fn create_and_get() {
		let cache = Cache::new(Duration::ZERO);

		let object = cache.create("chat/main/0/0", header(1), Duration::from_secs(60)).unwrap();
		assert_eq!(object.len(), 0);
		assert!(!object.is_eof());

		let found = cache.get("chat/main/0/0").unwrap();
		assert!(Arc::ptr_eq(&object, &found));

		assert!(cache.get("chat/main/0/1").is_none());
	}

	#[tokio::test]
	async fn replace_after_eof() {
		let cache = Cache::new(Duration::ZERO);

		let first = cache.create("chat/main/0/0", header(1), Duration::from_secs(60)).unwrap();

		// A second create fails while the first is still open.
		assert!(matches!(
			cache.create("chat/main/0/0", header(1), Duration::from_secs(60)),
			Err(CacheError::OverwriteOpenObject)
		));

		first.write_payload(b"hello");
		first.set_eof();

		// Once complete, a republish replaces the entry.
		let second = cache.create("chat/main/0/0", header(1), Duration::from_secs(60)).unwrap();
		assert!(!Arc::ptr_eq(&first, &second));
		assert!(Arc::ptr_eq(&second, &cache.get("chat/main/0/0").unwrap()));
	}

	#[tokio::test]
	async fn sweep_expired() {
		let cache = Cache::new(Duration::ZERO);

		let object = cache.create("chat/main/0/0", header(1), Duration::from_secs(1)).unwrap();
		object.set_eof();

		let received = object.received_at;

		// Half a second in, the entry is too young to collect.
		cache.sweep(received + Duration::from_millis(500));
		assert!(cache.get("chat/main/0/0").is_some());

		// Past its TTL it goes away.
		cache.sweep(received + Duration::from_millis(1500));
		assert!(cache.get("chat/main/0/0").is_none());
	}

	#[tokio::test]
	async fn sweep_keeps_open_objects() {
		let cache = Cache::new(Duration::ZERO);

		let object = cache.create("chat/main/0/0", header(1), Duration::from_secs(1)).unwrap();
		let received = object.received_at;

		// Never EOF'd, so it survives any number of sweeps.
		cache.sweep(received + Duration::from_secs(3600));
		assert!(cache.get("chat/main/0/0").is_some());
	}

	#[tokio::test]
	async fn stop_is_idempotent() {
		let cache = Cache::new(Duration::from_millis(10));
		cache.stop().await;
		cache.stop().await;
	}
}
