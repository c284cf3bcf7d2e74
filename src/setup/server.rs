use crate::coding::{AsyncRead, AsyncWrite, DecodeError, EncodeError, Params, VarInt};

use super::{Role, Version};

/// The SERVER_SETUP message id.
pub const SERVER_SETUP: u32 = 0x41;

/// Sent by the server in response to a client SETUP.
#[derive(Debug, Clone)]
pub struct Server {
	/// The version selected by the server.
	pub version: Version,

	/// The server's role, carried as a parameter.
	pub role: Role,
}

impl Server {
	pub async fn decode<R: AsyncRead>(r: &mut R) -> Result<Self, DecodeError> {
		let typ = VarInt::decode(r).await?;
		if typ.into_inner() != SERVER_SETUP as u64 {
			return Err(DecodeError::InvalidType(typ));
		}

		let version = Version::decode(r).await?;
		let params = Params::decode(r).await?;

		// An absent role reads as the unset value, which is rejected.
		let role = Role::try_from(params.role.map(VarInt::into_inner).unwrap_or(0))?;

		Ok(Self { version, role })
	}

	pub async fn encode<W: AsyncWrite>(&self, w: &mut W) -> Result<(), EncodeError> {
		VarInt::from_u32(SERVER_SETUP).encode(w).await?;
		self.version.encode(w).await?;

		let params = Params {
			role: Some(self.role.into()),
			auth_info: None,
		};
		params.encode(w).await?;

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn round_trip() {
		let server = Server {
			version: Version::DRAFT_01,
			role: Role::Both,
		};

		let mut buf = std::io::Cursor::new(Vec::new());
		server.encode(&mut buf).await.unwrap();

		let buf = buf.into_inner();
		let mut r = buf.as_slice();
		let decoded = Server::decode(&mut r).await.unwrap();

		assert_eq!(decoded.version, Version::DRAFT_01);
		assert_eq!(decoded.role, Role::Both);
	}
}
