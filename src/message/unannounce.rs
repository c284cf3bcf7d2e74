use crate::coding::{decode_string, encode_string, AsyncRead, AsyncWrite, DecodeError, EncodeError, MAX_STRING};

/// Sent by a publisher to withdraw a track namespace.
#[derive(Clone, Debug)]
pub struct Unannounce {
	/// The namespace being withdrawn.
	pub track_namespace: String,
}

impl Unannounce {
	pub async fn decode<R: AsyncRead>(r: &mut R) -> Result<Self, DecodeError> {
		let track_namespace = decode_string(r, MAX_STRING).await?;
		Ok(Self { track_namespace })
	}

	pub async fn encode<W: AsyncWrite>(&self, w: &mut W) -> Result<(), EncodeError> {
		encode_string(&self.track_namespace, w).await
	}
}
