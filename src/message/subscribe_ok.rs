use crate::coding::{decode_string, encode_string, AsyncRead, AsyncWrite, DecodeError, EncodeError, VarInt, MAX_STRING};

/// Sent by a publisher to accept a SUBSCRIBE, assigning the track id.
#[derive(Clone, Debug)]
pub struct SubscribeOk {
	/// The track namespace.
	pub track_namespace: String,

	/// The track name.
	pub track_name: String,

	/// The numeric alias objects will use for this track.
	pub track_id: VarInt,

	/// The subscription lifetime; zero means no expiry.
	pub expires: VarInt,
}

impl SubscribeOk {
	pub async fn decode<R: AsyncRead>(r: &mut R) -> Result<Self, DecodeError> {
		let track_namespace = decode_string(r, MAX_STRING).await?;
		let track_name = decode_string(r, MAX_STRING).await?;
		let track_id = VarInt::decode(r).await?;
		let expires = VarInt::decode(r).await?;

		Ok(Self {
			track_namespace,
			track_name,
			track_id,
			expires,
		})
	}

	pub async fn encode<W: AsyncWrite>(&self, w: &mut W) -> Result<(), EncodeError> {
		encode_string(&self.track_namespace, w).await?;
		encode_string(&self.track_name, w).await?;
		self.track_id.encode(w).await?;
		self.expires.encode(w).await?;

		Ok(())
	}
}
