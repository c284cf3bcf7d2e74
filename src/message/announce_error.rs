use crate::coding::{decode_string, encode_string, AsyncRead, AsyncWrite, DecodeError, EncodeError, VarInt, MAX_STRING};

/// Sent in response to a failed ANNOUNCE.
#[derive(Clone, Debug)]
pub struct AnnounceError {
	/// The namespace that was rejected.
	pub track_namespace: String,

	/// An error code.
	pub code: VarInt,

	/// A human-readable reason.
	pub reason: String,
}

impl AnnounceError {
	/// The namespace could not be registered on this session.
	pub const ADDING_TRACK: VarInt = VarInt::from_u32(0x2);

	pub async fn decode<R: AsyncRead>(r: &mut R) -> Result<Self, DecodeError> {
		let track_namespace = decode_string(r, MAX_STRING).await?;
		let code = VarInt::decode(r).await?;
		let reason = decode_string(r, MAX_STRING).await?;

		Ok(Self {
			track_namespace,
			code,
			reason,
		})
	}

	pub async fn encode<W: AsyncWrite>(&self, w: &mut W) -> Result<(), EncodeError> {
		encode_string(&self.track_namespace, w).await?;
		self.code.encode(w).await?;
		encode_string(&self.reason, w).await?;

		Ok(())
	}
}
