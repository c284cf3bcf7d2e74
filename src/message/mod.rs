mod announce;
mod announce_error;
mod announce_ok;
mod object;
mod subscribe;
mod subscribe_error;
mod subscribe_ok;
mod unannounce;

pub use announce::*;
pub use announce_error::*;
pub use announce_ok::*;
pub use object::*;
pub use subscribe::*;
pub use subscribe_error::*;
pub use subscribe_ok::*;
pub use unannounce::*;

use std::fmt;
use std::io;

use tokio::io::AsyncReadExt;

use crate::coding::{AsyncRead, AsyncWrite, DecodeError, EncodeError, VarInt};

// NOTE: OBJECT (0x0) travels on unidirectional streams and CLIENT_SETUP /
// SERVER_SETUP (0x40 / 0x41) are the control stream header; they live in
// their own modules. Everything here is exchanged on the control stream
// after SETUP completes.

// Use a macro to generate the message types rather than copy-paste.
// This implements a decode/encode method that uses the specified type.
macro_rules! message_types {
    {$($name:ident = $val:expr,)*} => {
		/// A control message, prefixed with a varint message type.
		#[derive(Clone)]
		pub enum Message {
			$($name($name)),*
		}

		impl Message {
			pub async fn decode<R: AsyncRead>(r: &mut R) -> Result<Self, DecodeError> {
				// Read the first byte by hand so a clean FIN surfaces as Final.
				let t = match r.read_u8().await {
					Ok(b) => VarInt::decode_byte(b, r).await?,
					Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Err(DecodeError::Final),
					Err(e) => return Err(e.into()),
				};

				match t.into_inner() {
					$($val => {
						let msg = $name::decode(r).await?;
						Ok(Self::$name(msg))
					})*
					_ => Err(DecodeError::InvalidType(t)),
				}
			}

			pub async fn encode<W: AsyncWrite>(&self, w: &mut W) -> Result<(), EncodeError> {
				match self {
					$(Self::$name(ref m) => {
						VarInt::from_u32($val).encode(w).await?;
						m.encode(w).await
					},)*
				}
			}

			pub fn id(&self) -> VarInt {
				match self {
					$(Self::$name(_) => {
						VarInt::from_u32($val)
					},)*
				}
			}

			pub fn name(&self) -> &'static str {
				match self {
					$(Self::$name(_) => {
						stringify!($name)
					},)*
				}
			}
		}

		$(impl From<$name> for Message {
			fn from(m: $name) -> Self {
				Message::$name(m)
			}
		})*

		impl fmt::Debug for Message {
			// Delegate to the message formatter
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				match self {
					$(Self::$name(ref m) => m.fmt(f),)*
				}
			}
		}
    }
}

// Each message is prefixed with the given VarInt type.
message_types! {
	Subscribe = 0x3,
	SubscribeOk = 0x4,
	SubscribeError = 0x5,
	Announce = 0x6,
	AnnounceOk = 0x7,
	AnnounceError = 0x8,
	Unannounce = 0x9,
}

#[cfg(test)]
mod tests {
	use super::*;

	async fn round_trip(msg: Message) -> Message {
		let mut buf = std::io::Cursor::new(Vec::new());
		msg.encode(&mut buf).await.unwrap();

		let buf = buf.into_inner();
		let mut r = buf.as_slice();
		Message::decode(&mut r).await.unwrap()
	}

	#[tokio::test]
	async fn announce() {
		let msg = round_trip(
			Announce {
				track_namespace: "simplechat".to_string(),
				auth_info: "secret".to_string(),
			}
			.into(),
		)
		.await;

		match msg {
			Message::Announce(msg) => {
				assert_eq!(msg.track_namespace, "simplechat");
				assert_eq!(msg.auth_info, "secret");
			}
			other => panic!("unexpected message: {:?}", other),
		}
	}

	#[tokio::test]
	async fn subscribe() {
		let msg = round_trip(
			Subscribe {
				track_namespace: "simplechat".to_string(),
				track_name: "main".to_string(),
				start_group: Location::RelativePrevious(0),
				start_object: Location::Absolute(7),
				end_group: Location::None,
				end_object: Location::None,
				auth_info: String::new(),
			}
			.into(),
		)
		.await;

		match msg {
			Message::Subscribe(msg) => {
				assert_eq!(msg.track_namespace, "simplechat");
				assert_eq!(msg.track_name, "main");
				assert_eq!(msg.start_group, Location::RelativePrevious(0));
				assert_eq!(msg.start_object, Location::Absolute(7));
				assert_eq!(msg.end_group, Location::None);
				assert_eq!(msg.end_object, Location::None);
			}
			other => panic!("unexpected message: {:?}", other),
		}
	}

	#[tokio::test]
	async fn subscribe_ok() {
		let msg = round_trip(
			SubscribeOk {
				track_namespace: "simplechat".to_string(),
				track_name: "main".to_string(),
				track_id: VarInt::from_u32(7),
				expires: VarInt::ZERO,
			}
			.into(),
		)
		.await;

		match msg {
			Message::SubscribeOk(msg) => {
				assert_eq!(msg.track_id.into_inner(), 7);
				assert_eq!(msg.expires.into_inner(), 0);
			}
			other => panic!("unexpected message: {:?}", other),
		}
	}

	#[tokio::test]
	async fn subscribe_error() {
		let msg = round_trip(
			SubscribeError {
				track_namespace: "simplechat".to_string(),
				track_name: "main".to_string(),
				code: SubscribeError::NO_PUBLISHERS,
				reason: "no publishers".to_string(),
			}
			.into(),
		)
		.await;

		match msg {
			Message::SubscribeError(msg) => {
				assert_eq!(msg.code, SubscribeError::NO_PUBLISHERS);
				assert_eq!(msg.reason, "no publishers");
			}
			other => panic!("unexpected message: {:?}", other),
		}
	}

	#[tokio::test]
	async fn unknown_type() {
		let mut buf = std::io::Cursor::new(Vec::new());
		VarInt::from_u32(0x3f).encode(&mut buf).await.unwrap();

		let buf = buf.into_inner();
		let mut r = buf.as_slice();
		assert!(matches!(
			Message::decode(&mut r).await,
			Err(DecodeError::InvalidType(_))
		));
	}

	#[tokio::test]
	async fn clean_eof() {
		let mut r: &[u8] = &[];
		assert!(matches!(Message::decode(&mut r).await, Err(DecodeError::Final)));
	}
}
