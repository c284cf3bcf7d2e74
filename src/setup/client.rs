use crate::coding::{AsyncRead, AsyncWrite, DecodeError, EncodeError, Params, VarInt};

use super::{Role, Versions};

/// The CLIENT_SETUP message id.
pub const CLIENT_SETUP: u32 = 0x40;

/// Sent by the client to set up the session.
#[derive(Debug, Clone)]
pub struct Client {
	/// The list of supported versions in preferred order.
	pub versions: Versions,

	/// The client's role, carried as a parameter.
	/// A missing or unknown role is a protocol violation the caller enforces.
	pub role: Option<Role>,
}

impl Client {
	pub async fn decode<R: AsyncRead>(r: &mut R) -> Result<Self, DecodeError> {
		let typ = VarInt::decode(r).await?;
		if typ.into_inner() != CLIENT_SETUP as u64 {
			return Err(DecodeError::InvalidType(typ));
		}

		let versions = Versions::decode(r).await?;
		let params = Params::decode(r).await?;
		let role = params.role.map(Role::try_from).transpose()?;

		Ok(Self { versions, role })
	}

	pub async fn encode<W: AsyncWrite>(&self, w: &mut W) -> Result<(), EncodeError> {
		VarInt::from_u32(CLIENT_SETUP).encode(w).await?;
		self.versions.encode(w).await?;

		let params = Params {
			role: self.role.map(VarInt::from),
			auth_info: None,
		};
		params.encode(w).await?;

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::setup::Version;

	#[tokio::test]
	async fn round_trip() {
		let client = Client {
			versions: [Version::DRAFT_00, Version::DRAFT_01].into(),
			role: Some(Role::Publisher),
		};

		let mut buf = std::io::Cursor::new(Vec::new());
		client.encode(&mut buf).await.unwrap();

		let buf = buf.into_inner();
		let mut r = buf.as_slice();
		let decoded = Client::decode(&mut r).await.unwrap();

		assert_eq!(*decoded.versions, vec![Version::DRAFT_00, Version::DRAFT_01]);
		assert_eq!(decoded.role, Some(Role::Publisher));
	}

	#[tokio::test]
	async fn wrong_type() {
		let mut buf = std::io::Cursor::new(Vec::new());
		VarInt::from_u32(0x41).encode(&mut buf).await.unwrap();

		let buf = buf.into_inner();
		let mut r = buf.as_slice();
		assert!(matches!(
			Client::decode(&mut r).await,
			Err(DecodeError::InvalidType(_))
		));
	}
}
