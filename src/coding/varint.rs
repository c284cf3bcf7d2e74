// Based on quinn-proto
// https://github.com/quinn-rs/quinn/blob/main/quinn-proto/src/varint.rs
// Licensed via Apache 2.0 and MIT

use std::convert::{TryFrom, TryInto};
use std::fmt;

use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use super::{AsyncRead, AsyncWrite, DecodeError, EncodeError};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Error)]
#[error("value too large for varint encoding")]
pub struct BoundsExceeded;

/// An integer less than 2^62
///
/// Values of this type are suitable for encoding as QUIC variable-length integer.
#[derive(Default, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VarInt(u64);

impl VarInt {
	pub const MAX: Self = Self((1 << 62) - 1);
	pub const ZERO: Self = Self(0);

	/// Construct a `VarInt` infallibly using the largest available type.
	/// Larger values need to use `try_from` instead.
	pub const fn from_u32(x: u32) -> Self {
		Self(x as u64)
	}

	/// Extract the integer value
	pub const fn into_inner(self) -> u64 {
		self.0
	}

	/// The number of bytes the encoded value occupies.
	pub fn size(&self) -> usize {
		match self.0 {
			x if x < 2u64.pow(6) => 1,
			x if x < 2u64.pow(14) => 2,
			x if x < 2u64.pow(30) => 4,
			_ => 8,
		}
	}

	/// Decode a varint from the stream.
	pub async fn decode<R: AsyncRead>(r: &mut R) -> Result<Self, DecodeError> {
		let b = r.read_u8().await?;
		Self::decode_byte(b, r).await
	}

	/// Decode a varint given its first byte, reading the remainder from the stream.
	/// The length is encoded in the top two bits of the first byte.
	pub async fn decode_byte<R: AsyncRead>(b: u8, r: &mut R) -> Result<Self, DecodeError> {
		let tag = b >> 6;

		let mut buf = [0u8; 8];
		buf[0] = b & 0b0011_1111;

		let x = match tag {
			0b00 => u64::from(buf[0]),
			0b01 => {
				r.read_exact(&mut buf[1..2]).await?;
				u64::from(u16::from_be_bytes(buf[..2].try_into().unwrap()))
			}
			0b10 => {
				r.read_exact(&mut buf[1..4]).await?;
				u64::from(u32::from_be_bytes(buf[..4].try_into().unwrap()))
			}
			0b11 => {
				r.read_exact(&mut buf[1..8]).await?;
				u64::from_be_bytes(buf)
			}
			_ => unreachable!(),
		};

		Ok(Self(x))
	}

	/// Encode a varint using the shortest legal encoding.
	pub async fn encode<W: AsyncWrite>(&self, w: &mut W) -> Result<(), EncodeError> {
		let x = self.0;
		if x < 2u64.pow(6) {
			w.write_u8(x as u8).await?;
		} else if x < 2u64.pow(14) {
			w.write_u16(0b01 << 14 | x as u16).await?;
		} else if x < 2u64.pow(30) {
			w.write_u32(0b10 << 30 | x as u32).await?;
		} else if x < 2u64.pow(62) {
			w.write_u64(0b11 << 62 | x).await?;
		} else {
			unreachable!("malformed VarInt");
		}

		Ok(())
	}
}

impl From<VarInt> for u64 {
	fn from(x: VarInt) -> Self {
		x.0
	}
}

impl From<VarInt> for usize {
	fn from(x: VarInt) -> Self {
		x.0 as usize
	}
}

impl From<u8> for VarInt {
	fn from(x: u8) -> Self {
		Self(x.into())
	}
}

impl From<u16> for VarInt {
	fn from(x: u16) -> Self {
		Self(x.into())
	}
}

impl From<u32> for VarInt {
	fn from(x: u32) -> Self {
		Self(x.into())
	}
}

impl TryFrom<u64> for VarInt {
	type Error = BoundsExceeded;

	/// Succeeds iff `x` < 2^62
	fn try_from(x: u64) -> Result<Self, BoundsExceeded> {
		if x <= Self::MAX.into_inner() {
			Ok(Self(x))
		} else {
			Err(BoundsExceeded)
		}
	}
}

impl TryFrom<usize> for VarInt {
	type Error = BoundsExceeded;

	/// Succeeds iff `x` < 2^62
	fn try_from(x: usize) -> Result<Self, BoundsExceeded> {
		Self::try_from(x as u64)
	}
}

impl fmt::Debug for VarInt {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		self.0.fmt(f)
	}
}

impl fmt::Display for VarInt {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		self.0.fmt(f)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	async fn encode(v: u64) -> Vec<u8> {
		let mut buf = std::io::Cursor::new(Vec::new());
		VarInt::try_from(v).unwrap().encode(&mut buf).await.unwrap();
		buf.into_inner()
	}

	async fn decode(data: &[u8]) -> u64 {
		let mut r = data;
		VarInt::decode(&mut r).await.unwrap().into_inner()
	}

	#[tokio::test]
	async fn boundaries() {
		// Each boundary value must use the smallest legal encoding.
		assert_eq!(encode(0).await.len(), 1);
		assert_eq!(encode(63).await.len(), 1);
		assert_eq!(encode(64).await.len(), 2);
		assert_eq!(encode(16383).await.len(), 2);
		assert_eq!(encode(16384).await.len(), 4);
		assert_eq!(encode(1073741823).await.len(), 4);
		assert_eq!(encode(1073741824).await.len(), 8);
		assert_eq!(encode((1 << 62) - 1).await.len(), 8);
	}

	#[tokio::test]
	async fn round_trip() {
		for v in [
			0,
			1,
			63,
			64,
			16383,
			16384,
			1073741823,
			1073741824,
			(1 << 62) - 1,
		] {
			let buf = encode(v).await;
			assert_eq!(decode(&buf).await, v);
			assert_eq!(buf.len(), VarInt::try_from(v).unwrap().size());
		}
	}

	#[tokio::test]
	async fn overflow() {
		assert_eq!(VarInt::try_from(1u64 << 62), Err(BoundsExceeded));
		assert_eq!(VarInt::try_from(u64::MAX), Err(BoundsExceeded));
	}

	#[tokio::test]
	async fn truncated() {
		// A two byte encoding with the second byte missing.
		let mut r: &[u8] = &[0b0100_0000];
		assert!(matches!(
			VarInt::decode(&mut r).await,
			Err(DecodeError::UnexpectedEnd)
		));
	}
}
