use std::cmp::min;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use tokio::sync::Notify;

use crate::message;

/// A media object being received and relayed at the same time.
///
/// The payload only ever grows, and reader offsets stay valid across appends.
/// Once `set_eof` is called the payload is immutable.
pub struct Object {
	/// The OBJECT header this entry was created from.
	pub header: message::Object,

	/// When the header arrived.
	pub received_at: Instant,

	/// How long to keep the object once complete.
	pub max_age: Duration,

	state: RwLock<State>,

	// Wakes readers blocked waiting for payload or the EOF marker.
	wake: Notify,
}

#[derive(Default)]
struct State {
	buffer: Vec<u8>,
	eof: bool,
}

impl Object {
	pub fn new(header: message::Object, max_age: Duration) -> Self {
		Self {
			header,
			received_at: Instant::now(),
			max_age,
			state: RwLock::new(State::default()),
			wake: Notify::new(),
		}
	}

	/// Append payload bytes.
	pub fn write_payload(&self, data: &[u8]) {
		let mut state = self.state.write().unwrap();
		state.buffer.extend_from_slice(data);
		drop(state);

		self.wake.notify_waiters();
	}

	/// Mark the payload complete. No more bytes may be appended.
	pub fn set_eof(&self) {
		self.state.write().unwrap().eof = true;
		self.wake.notify_waiters();
	}

	pub fn is_eof(&self) -> bool {
		self.state.read().unwrap().eof
	}

	pub fn len(&self) -> usize {
		self.state.read().unwrap().buffer.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// A new cursor over the payload, starting at the first byte.
	pub fn reader(self: &Arc<Self>) -> ObjectReader {
		ObjectReader {
			object: self.clone(),
			offset: 0,
		}
	}
}

/// A cheap cursor over an object's payload.
///
/// Readers see every byte exactly once, in order, including bytes appended
/// after the reader was created.
pub struct ObjectReader {
	object: Arc<Object>,
	offset: usize,
}

impl ObjectReader {
	/// Copy available bytes without waiting.
	///
	/// `Some(0)` is the clean end of the object; `None` means no payload is
	/// available yet.
	pub fn try_read(&mut self, buf: &mut [u8]) -> Option<usize> {
		let state = self.object.state.read().unwrap();

		if self.offset == state.buffer.len() {
			if state.eof {
				return Some(0);
			}
			return None;
		}

		let n = min(buf.len(), state.buffer.len() - self.offset);
		buf[..n].copy_from_slice(&state.buffer[self.offset..self.offset + n]);
		self.offset += n;

		Some(n)
	}

	/// Copy available bytes, waiting for the writer when there are none.
	/// Returns 0 only at the clean end of the object.
	pub async fn read(&mut self, buf: &mut [u8]) -> usize {
		loop {
			// Register for a wakeup before checking, so an append between the
			// check and the await is not lost.
			let object = self.object.clone();
			let wake = object.wake.notified();

			if let Some(n) = self.try_read(buf) {
				return n;
			}

			wake.await;
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::coding::VarInt;

	fn object() -> Arc<Object> {
		Arc::new(Object::new(
			message::Object {
				track_id: VarInt::from_u32(1),
				group_sequence: VarInt::ZERO,
				object_sequence: VarInt::ZERO,
				send_order: VarInt::ZERO,
			},
			Duration::from_secs(60),
		))
	}

	#[tokio::test]
	async fn reader_sees_all_appends() {
		let object = object();
		object.write_payload(b"he");

		// Created after the first append, the reader still starts at zero.
		let mut reader = object.reader();

		let mut buf = [0u8; 16];
		assert_eq!(reader.try_read(&mut buf), Some(2));
		assert_eq!(&buf[..2], b"he");

		// Nothing more yet.
		assert_eq!(reader.try_read(&mut buf), None);

		object.write_payload(b"llo");
		object.set_eof();

		assert_eq!(reader.read(&mut buf).await, 3);
		assert_eq!(&buf[..3], b"llo");

		// Drained and complete.
		assert_eq!(reader.read(&mut buf).await, 0);
	}

	#[tokio::test]
	async fn read_waits_for_writer() {
		let object = object();
		let mut reader = object.reader();

		let writer = object.clone();
		let task = tokio::spawn(async move {
			tokio::time::sleep(Duration::from_millis(10)).await;
			writer.write_payload(b"AB");
			writer.set_eof();
		});

		let mut buf = [0u8; 16];
		assert_eq!(reader.read(&mut buf).await, 2);
		assert_eq!(&buf[..2], b"AB");
		assert_eq!(reader.read(&mut buf).await, 0);

		task.await.unwrap();
	}

	#[tokio::test]
	async fn independent_cursors() {
		let object = object();
		object.write_payload(b"AB");
		object.set_eof();

		let mut first = object.reader();
		let mut second = object.reader();

		let mut buf = [0u8; 1];
		assert_eq!(first.read(&mut buf).await, 1);
		assert_eq!(&buf, b"A");

		// The second cursor is unaffected by the first.
		let mut buf = [0u8; 16];
		assert_eq!(second.read(&mut buf).await, 2);
		assert_eq!(&buf[..2], b"AB");

		let mut buf = [0u8; 1];
		assert_eq!(first.read(&mut buf).await, 1);
		assert_eq!(&buf, b"B");
	}
}
