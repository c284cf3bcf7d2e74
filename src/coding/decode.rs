use std::io;
use std::string::FromUtf8Error;

use thiserror::Error;

use super::{BoundsExceeded, VarInt};

/// A decode error returned by the wire codec.
#[derive(Debug, Error)]
pub enum DecodeError {
	/// The stream ended cleanly before the first byte of a message.
	/// Callers use this to tell an orderly shutdown apart from a truncation.
	#[error("stream finished")]
	Final,

	#[error("unexpected end of stream")]
	UnexpectedEnd,

	#[error("invalid string")]
	InvalidString(#[from] FromUtf8Error),

	#[error("string too long: {0}")]
	StringTooLong(u64),

	#[error("too many parameters: {0}")]
	TooManyParams(u64),

	#[error("too many versions: {0}")]
	TooManyVersions(u64),

	#[error("invalid message type: {0:?}")]
	InvalidType(VarInt),

	#[error("invalid role: {0}")]
	InvalidRole(u64),

	#[error("invalid subscribe location: {0}")]
	InvalidLocation(u64),

	#[error("varint bounds exceeded")]
	BoundsExceeded(#[from] BoundsExceeded),

	#[error("io error: {0}")]
	IoError(io::Error),
}

impl From<io::Error> for DecodeError {
	fn from(err: io::Error) -> Self {
		// tokio's read_exact surfaces a partial read as UnexpectedEof.
		match err.kind() {
			io::ErrorKind::UnexpectedEof => Self::UnexpectedEnd,
			_ => Self::IoError(err),
		}
	}
}
