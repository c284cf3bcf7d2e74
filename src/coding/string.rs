use tokio::io::{AsyncReadExt, AsyncWriteExt};

use super::{AsyncRead, AsyncWrite, DecodeError, EncodeError, VarInt};

/// The limit on every string we read off the wire.
pub const MAX_STRING: usize = 1024;

/// Decode a string with a varint length prefix, enforcing the given maximum.
pub async fn decode_string<R: AsyncRead>(r: &mut R, max: usize) -> Result<String, DecodeError> {
	let size = VarInt::decode(r).await?.into_inner();
	if size > max as u64 {
		return Err(DecodeError::StringTooLong(size));
	}

	let mut buf = vec![0u8; size as usize];
	r.read_exact(&mut buf).await?;

	Ok(String::from_utf8(buf)?)
}

/// Encode a string with a varint length prefix.
pub async fn encode_string<W: AsyncWrite>(s: &str, w: &mut W) -> Result<(), EncodeError> {
	VarInt::try_from(s.len())?.encode(w).await?;
	w.write_all(s.as_bytes()).await?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn round_trip() {
		for s in ["", "x", "simplechat", &"a".repeat(MAX_STRING)] {
			let mut buf = std::io::Cursor::new(Vec::new());
			encode_string(s, &mut buf).await.unwrap();

			let buf = buf.into_inner();
			let mut r = buf.as_slice();
			assert_eq!(decode_string(&mut r, MAX_STRING).await.unwrap(), s);
		}
	}

	#[tokio::test]
	async fn too_long() {
		let s = "a".repeat(MAX_STRING + 1);
		let mut buf = std::io::Cursor::new(Vec::new());
		encode_string(&s, &mut buf).await.unwrap();

		let buf = buf.into_inner();
		let mut r = buf.as_slice();
		assert!(matches!(
			decode_string(&mut r, MAX_STRING).await,
			Err(DecodeError::StringTooLong(1025))
		));
	}
}
