use crate::coding::{DecodeError, VarInt};

/// The role negotiated during SETUP.
///
/// An absent role parameter is represented as `None` by the callers; a session
/// is never created without a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
	Publisher,
	Subscriber,
	Both,
}

impl Role {
	pub fn is_publisher(&self) -> bool {
		match self {
			Self::Publisher | Self::Both => true,
			Self::Subscriber => false,
		}
	}

	pub fn is_subscriber(&self) -> bool {
		match self {
			Self::Subscriber | Self::Both => true,
			Self::Publisher => false,
		}
	}

	/// The role the server answers with: the mirror of the client's role.
	pub fn invert(self) -> Self {
		match self {
			Self::Publisher => Self::Subscriber,
			Self::Subscriber => Self::Publisher,
			Self::Both => Self::Both,
		}
	}
}

impl From<Role> for u64 {
	fn from(r: Role) -> Self {
		match r {
			Role::Publisher => 0x1,
			Role::Subscriber => 0x2,
			Role::Both => 0x3,
		}
	}
}

impl From<Role> for VarInt {
	fn from(r: Role) -> Self {
		VarInt::from_u32(match r {
			Role::Publisher => 0x1,
			Role::Subscriber => 0x2,
			Role::Both => 0x3,
		})
	}
}

impl TryFrom<u64> for Role {
	type Error = DecodeError;

	fn try_from(v: u64) -> Result<Self, Self::Error> {
		Ok(match v {
			0x1 => Self::Publisher,
			0x2 => Self::Subscriber,
			0x3 => Self::Both,
			_ => return Err(DecodeError::InvalidRole(v)),
		})
	}
}

impl TryFrom<VarInt> for Role {
	type Error = DecodeError;

	fn try_from(v: VarInt) -> Result<Self, Self::Error> {
		v.into_inner().try_into()
	}
}
