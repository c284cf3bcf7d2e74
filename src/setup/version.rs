use std::ops::Deref;

use crate::coding::{AsyncRead, AsyncWrite, DecodeError, EncodeError, VarInt};

/// The limit on the number of versions a client may advertise.
pub const MAX_VERSIONS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version(pub u64);

impl Version {
	pub const DRAFT_00: Version = Version(0xff00);
	pub const DRAFT_01: Version = Version(0xff000001);

	/// The only version this server speaks.
	pub const SUPPORTED: Version = Version::DRAFT_01;

	pub async fn decode<R: AsyncRead>(r: &mut R) -> Result<Self, DecodeError> {
		let v = VarInt::decode(r).await?;
		Ok(Self(v.into_inner()))
	}

	pub async fn encode<W: AsyncWrite>(&self, w: &mut W) -> Result<(), EncodeError> {
		VarInt::try_from(self.0)?.encode(w).await
	}
}

impl From<u64> for Version {
	fn from(v: u64) -> Self {
		Self(v)
	}
}

impl From<Version> for u64 {
	fn from(v: Version) -> Self {
		v.0
	}
}

/// The list of versions advertised in a client SETUP, in preferred order.
#[derive(Debug, Clone, Default)]
pub struct Versions(pub Vec<Version>);

impl Versions {
	pub async fn decode<R: AsyncRead>(r: &mut R) -> Result<Self, DecodeError> {
		let count = VarInt::decode(r).await?.into_inner();
		if count > MAX_VERSIONS {
			return Err(DecodeError::TooManyVersions(count));
		}

		let mut versions = Vec::with_capacity(count as usize);
		for _ in 0..count {
			versions.push(Version::decode(r).await?);
		}

		Ok(Self(versions))
	}

	pub async fn encode<W: AsyncWrite>(&self, w: &mut W) -> Result<(), EncodeError> {
		VarInt::try_from(self.0.len())?.encode(w).await?;
		for version in &self.0 {
			version.encode(w).await?;
		}

		Ok(())
	}
}

impl Deref for Versions {
	type Target = Vec<Version>;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

impl From<Vec<Version>> for Versions {
	fn from(versions: Vec<Version>) -> Self {
		Self(versions)
	}
}

impl<const N: usize> From<[Version; N]> for Versions {
	fn from(versions: [Version; N]) -> Self {
		Self(versions.to_vec())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn too_many() {
		let mut buf = std::io::Cursor::new(Vec::new());
		let versions: Versions = vec![Version::DRAFT_01; 11].into();
		versions.encode(&mut buf).await.unwrap();

		let buf = buf.into_inner();
		let mut r = buf.as_slice();
		assert!(matches!(
			Versions::decode(&mut r).await,
			Err(DecodeError::TooManyVersions(11))
		));
	}
}
