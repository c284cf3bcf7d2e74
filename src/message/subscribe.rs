use crate::coding::{decode_string, encode_string, AsyncRead, AsyncWrite, DecodeError, EncodeError, Params, VarInt, MAX_STRING};

/// A group or object position within a subscription window.
///
/// On the wire this is a type varint followed by a value varint, with the
/// value omitted entirely for `None`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Location {
	#[default]
	None,
	Absolute(u64),
	RelativePrevious(u64),
	RelativeNext(u64),
}

impl Location {
	pub async fn decode<R: AsyncRead>(r: &mut R) -> Result<Self, DecodeError> {
		let mode = VarInt::decode(r).await?.into_inner();
		if mode == 0 {
			return Ok(Self::None);
		}

		let value = VarInt::decode(r).await?.into_inner();
		Ok(match mode {
			0x1 => Self::Absolute(value),
			0x2 => Self::RelativePrevious(value),
			0x3 => Self::RelativeNext(value),
			_ => return Err(DecodeError::InvalidLocation(mode)),
		})
	}

	pub async fn encode<W: AsyncWrite>(&self, w: &mut W) -> Result<(), EncodeError> {
		let (mode, value) = match self {
			Self::None => (0, None),
			Self::Absolute(value) => (0x1, Some(*value)),
			Self::RelativePrevious(value) => (0x2, Some(*value)),
			Self::RelativeNext(value) => (0x3, Some(*value)),
		};

		VarInt::from_u32(mode).encode(w).await?;
		if let Some(value) = value {
			VarInt::try_from(value)?.encode(w).await?;
		}

		Ok(())
	}
}

/// Sent by a subscriber to request all future objects for the given track.
#[derive(Clone, Debug)]
pub struct Subscribe {
	/// The track namespace.
	pub track_namespace: String,

	/// The track name.
	pub track_name: String,

	/// The requested subscription window.
	pub start_group: Location,
	pub start_object: Location,
	pub end_group: Location,
	pub end_object: Location,

	/// An opaque auth token, passed through unchanged.
	pub auth_info: String,
}

impl Subscribe {
	pub async fn decode<R: AsyncRead>(r: &mut R) -> Result<Self, DecodeError> {
		let track_namespace = decode_string(r, MAX_STRING).await?;
		let track_name = decode_string(r, MAX_STRING).await?;

		let start_group = Location::decode(r).await?;
		let start_object = Location::decode(r).await?;
		let end_group = Location::decode(r).await?;
		let end_object = Location::decode(r).await?;

		let params = Params::decode(r).await?;

		Ok(Self {
			track_namespace,
			track_name,
			start_group,
			start_object,
			end_group,
			end_object,
			auth_info: params.auth_info.unwrap_or_default(),
		})
	}

	pub async fn encode<W: AsyncWrite>(&self, w: &mut W) -> Result<(), EncodeError> {
		encode_string(&self.track_namespace, w).await?;
		encode_string(&self.track_name, w).await?;

		self.start_group.encode(w).await?;
		self.start_object.encode(w).await?;
		self.end_group.encode(w).await?;
		self.end_object.encode(w).await?;

		let params = Params {
			role: None,
			auth_info: Some(self.auth_info.clone()),
		};
		params.encode(w).await?;

		Ok(())
	}
}
