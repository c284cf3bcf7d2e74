use tokio::io::AsyncReadExt;

use super::{decode_string, encode_string, AsyncRead, AsyncWrite, DecodeError, EncodeError, VarInt};
use super::MAX_STRING;

/// The limit on the number of parameters in a single block.
pub const MAX_PARAMS: u64 = 256;

/// The role parameter, a varint with its own length prefix.
pub const PARAM_ROLE: u64 = 0x0;

/// An opaque authorization token, encoded as a string.
pub const PARAM_AUTH_INFO: u64 = 0x2;

/// The parameter block attached to SETUP, ANNOUNCE and SUBSCRIBE messages.
///
/// Only the parameters the relay understands are retained; unknown ids are
/// skipped over without buffering their payload.
#[derive(Default, Debug, Clone)]
pub struct Params {
	pub role: Option<VarInt>,
	pub auth_info: Option<String>,
}

impl Params {
	pub async fn decode<R: AsyncRead>(r: &mut R) -> Result<Self, DecodeError> {
		let mut params = Self::default();

		let count = VarInt::decode(r).await?.into_inner();
		if count > MAX_PARAMS {
			return Err(DecodeError::TooManyParams(count));
		}

		for _ in 0..count {
			let kind = VarInt::decode(r).await?.into_inner();
			match kind {
				PARAM_ROLE => {
					// The length is implied by the varint encoding itself.
					let _len = VarInt::decode(r).await?;
					params.role = Some(VarInt::decode(r).await?);
				}
				PARAM_AUTH_INFO => {
					params.auth_info = Some(decode_string(r, MAX_STRING).await?);
				}
				_ => {
					let size = VarInt::decode(r).await?.into_inner();
					let mut unknown = (&mut *r).take(size);
					let skipped = tokio::io::copy(&mut unknown, &mut tokio::io::sink()).await?;
					if skipped < size {
						return Err(DecodeError::UnexpectedEnd);
					}
				}
			}
		}

		Ok(params)
	}

	pub async fn encode<W: AsyncWrite>(&self, w: &mut W) -> Result<(), EncodeError> {
		let count = self.role.is_some() as u32 + self.auth_info.is_some() as u32;
		VarInt::from_u32(count).encode(w).await?;

		if let Some(role) = self.role {
			VarInt::try_from(PARAM_ROLE)?.encode(w).await?;
			VarInt::try_from(role.size())?.encode(w).await?;
			role.encode(w).await?;
		}

		if let Some(auth_info) = &self.auth_info {
			VarInt::try_from(PARAM_AUTH_INFO)?.encode(w).await?;
			encode_string(auth_info, w).await?;
		}

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn round_trip() {
		let params = Params {
			role: Some(VarInt::from_u32(2)),
			auth_info: Some("secret".to_string()),
		};

		let mut buf = std::io::Cursor::new(Vec::new());
		params.encode(&mut buf).await.unwrap();

		let buf = buf.into_inner();
		let mut r = buf.as_slice();
		let decoded = Params::decode(&mut r).await.unwrap();

		assert_eq!(decoded.role.unwrap().into_inner(), 2);
		assert_eq!(decoded.auth_info.as_deref(), Some("secret"));
	}

	#[tokio::test]
	async fn skips_unknown() {
		let mut buf = std::io::Cursor::new(Vec::new());

		// Two parameters: an unknown id with a 3 byte payload, then auth info.
		VarInt::from_u32(2).encode(&mut buf).await.unwrap();
		VarInt::from_u32(0x7f).encode(&mut buf).await.unwrap();
		VarInt::from_u32(3).encode(&mut buf).await.unwrap();
		tokio::io::AsyncWriteExt::write_all(&mut buf, &[1, 2, 3]).await.unwrap();
		VarInt::try_from(PARAM_AUTH_INFO).unwrap().encode(&mut buf).await.unwrap();
		encode_string("token", &mut buf).await.unwrap();

		let buf = buf.into_inner();
		let mut r = buf.as_slice();
		let decoded = Params::decode(&mut r).await.unwrap();

		assert!(decoded.role.is_none());
		assert_eq!(decoded.auth_info.as_deref(), Some("token"));
	}

	#[tokio::test]
	async fn too_many() {
		let mut buf = std::io::Cursor::new(Vec::new());
		VarInt::from_u32(257).encode(&mut buf).await.unwrap();

		let buf = buf.into_inner();
		let mut r = buf.as_slice();
		assert!(matches!(
			Params::decode(&mut r).await,
			Err(DecodeError::TooManyParams(257))
		));
	}
}
