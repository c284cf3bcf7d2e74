use crate::coding::{decode_string, encode_string, AsyncRead, AsyncWrite, DecodeError, EncodeError, Params, MAX_STRING};

/// Sent by a publisher to claim a track namespace.
#[derive(Clone, Debug)]
pub struct Announce {
	/// The track namespace being announced.
	pub track_namespace: String,

	/// An opaque auth token, passed through unchanged.
	pub auth_info: String,
}

impl Announce {
	pub async fn decode<R: AsyncRead>(r: &mut R) -> Result<Self, DecodeError> {
		let track_namespace = decode_string(r, MAX_STRING).await?;
		let params = Params::decode(r).await?;

		Ok(Self {
			track_namespace,
			auth_info: params.auth_info.unwrap_or_default(),
		})
	}

	pub async fn encode<W: AsyncWrite>(&self, w: &mut W) -> Result<(), EncodeError> {
		encode_string(&self.track_namespace, w).await?;

		let params = Params {
			role: None,
			auth_info: Some(self.auth_info.clone()),
		};
		params.encode(w).await?;

		Ok(())
	}
}
