use thiserror::Error;

/// MOQT session error codes, sent on the WebTransport close channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
	NoError,
	Generic,
	Unauthorized,
	ProtocolViolation,
	GoAwayTimeout,
}

impl ErrorCode {
	/// The integer sent over the wire.
	pub fn code(self) -> u32 {
		match self {
			Self::NoError => 0x0,
			Self::Generic => 0x1,
			Self::Unauthorized => 0x2,
			Self::ProtocolViolation => 0x3,
			Self::GoAwayTimeout => 0x10,
		}
	}
}

/// A fatal session error: the connection is closed with this code and reason.
#[derive(Debug, Clone, Error)]
#[error("{reason} ({code:?})")]
pub struct Terminate {
	pub code: ErrorCode,
	pub reason: String,
}

impl Terminate {
	pub fn new(code: ErrorCode, reason: impl Into<String>) -> Self {
		Self {
			code,
			reason: reason.into(),
		}
	}
}
