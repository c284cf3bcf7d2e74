use std::io;

use tokio::io::AsyncReadExt;

use crate::coding::{AsyncRead, AsyncWrite, DecodeError, EncodeError, VarInt};

/// The OBJECT message id.
pub const OBJECT: u32 = 0x0;

/// The header of an OBJECT, sent at the start of each unidirectional stream.
/// The payload is the remainder of the stream, up to the FIN.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Object {
	/// The track id assigned by SUBSCRIBE_OK.
	pub track_id: VarInt,

	/// The group sequence within the track.
	pub group_sequence: VarInt,

	/// The object sequence within the group.
	pub object_sequence: VarInt,

	/// A delivery priority hint, forwarded verbatim.
	pub send_order: VarInt,
}

impl Object {
	pub async fn decode<R: AsyncRead>(r: &mut R) -> Result<Self, DecodeError> {
		// A stream closed before any bytes is not an error, just ignored.
		let typ = match r.read_u8().await {
			Ok(b) => VarInt::decode_byte(b, r).await?,
			Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Err(DecodeError::Final),
			Err(e) => return Err(e.into()),
		};

		if typ.into_inner() != OBJECT as u64 {
			return Err(DecodeError::InvalidType(typ));
		}

		let track_id = VarInt::decode(r).await?;
		let group_sequence = VarInt::decode(r).await?;
		let object_sequence = VarInt::decode(r).await?;
		let send_order = VarInt::decode(r).await?;

		Ok(Self {
			track_id,
			group_sequence,
			object_sequence,
			send_order,
		})
	}

	pub async fn encode<W: AsyncWrite>(&self, w: &mut W) -> Result<(), EncodeError> {
		VarInt::from_u32(OBJECT).encode(w).await?;
		self.track_id.encode(w).await?;
		self.group_sequence.encode(w).await?;
		self.object_sequence.encode(w).await?;
		self.send_order.encode(w).await?;

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn round_trip() {
		let header = Object {
			track_id: VarInt::from_u32(42),
			group_sequence: VarInt::from_u32(1),
			object_sequence: VarInt::ZERO,
			send_order: VarInt::from_u32(100),
		};

		let mut buf = std::io::Cursor::new(Vec::new());
		header.encode(&mut buf).await.unwrap();

		let buf = buf.into_inner();
		let mut r = buf.as_slice();
		assert_eq!(Object::decode(&mut r).await.unwrap(), header);
	}

	#[tokio::test]
	async fn empty_stream() {
		let mut r: &[u8] = &[];
		assert!(matches!(Object::decode(&mut r).await, Err(DecodeError::Final)));
	}
}
