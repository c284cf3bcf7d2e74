use crate::coding::{decode_string, encode_string, AsyncRead, AsyncWrite, DecodeError, EncodeError, VarInt, MAX_STRING};

/// Sent in response to a failed SUBSCRIBE.
#[derive(Clone, Debug)]
pub struct SubscribeError {
	/// The track namespace.
	pub track_namespace: String,

	/// The track name.
	pub track_name: String,

	/// An error code.
	pub code: VarInt,

	/// A human-readable reason.
	pub reason: String,
}

impl SubscribeError {
	/// The subscription could not be recorded on this session.
	pub const ADDING_TRACK: VarInt = VarInt::from_u32(0x2);

	/// No publisher holds the requested namespace.
	pub const NO_PUBLISHERS: VarInt = VarInt::from_u32(0x3);

	pub async fn decode<R: AsyncRead>(r: &mut R) -> Result<Self, DecodeError> {
		let track_namespace = decode_string(r, MAX_STRING).await?;
		let track_name = decode_string(r, MAX_STRING).await?;
		let code = VarInt::decode(r).await?;
		let reason = decode_string(r, MAX_STRING).await?;

		Ok(Self {
			track_namespace,
			track_name,
			code,
			reason,
		})
	}

	pub async fn encode<W: AsyncWrite>(&self, w: &mut W) -> Result<(), EncodeError> {
		encode_string(&self.track_namespace, w).await?;
		encode_string(&self.track_name, w).await?;
		self.code.encode(w).await?;
		encode_string(&self.reason, w).await?;

		Ok(())
	}
}
