use std::io;

use thiserror::Error;

use super::BoundsExceeded;

/// An encode error returned by the wire codec.
#[derive(Debug, Error)]
pub enum EncodeError {
	#[error("varint too large")]
	BoundsExceeded(#[from] BoundsExceeded),

	#[error("io error: {0}")]
	IoError(#[from] io::Error),
}
