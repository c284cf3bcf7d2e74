use crate::coding::{decode_string, encode_string, AsyncRead, AsyncWrite, DecodeError, EncodeError, MAX_STRING};

/// Sent in response to a successful ANNOUNCE.
#[derive(Clone, Debug)]
pub struct AnnounceOk {
	/// The namespace being acknowledged.
	pub track_namespace: String,
}

impl AnnounceOk {
	pub async fn decode<R: AsyncRead>(r: &mut R) -> Result<Self, DecodeError> {
		let track_namespace = decode_string(r, MAX_STRING).await?;
		Ok(Self { track_namespace })
	}

	pub async fn encode<W: AsyncWrite>(&self, w: &mut W) -> Result<(), EncodeError> {
		encode_string(&self.track_namespace, w).await
	}
}
