use crate::error::{Error, Result};

pub const HEADER_SIZE: usize = 8;

/// Largest message libwayland will put on the wire.
pub const MAX_MESSAGE_SIZE: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
	pub object_id: u32,
	pub op: u16,
	pub size: u16,
}

impl Header {
	/// Reads a header from the front of `bytes`, `None` if fewer than
	/// [`HEADER_SIZE`] bytes are available.
	pub fn parse(bytes: &[u8]) -> Option<Self> {
		let object_id = u32::from_ne_bytes(bytes.get(0..4)?.try_into().ok()?);
		let word = u32::from_ne_bytes(bytes.get(4..8)?.try_into().ok()?);

		Some(Self {
			object_id,
			op: (word & 0xffff) as u16,
			size: (word >> 16) as u16,
		})
	}

	pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
		let word = (self.size as u32) << 16 | self.op as u32;

		let mut ret = [0u8; HEADER_SIZE];
		ret[..4].copy_from_slice(&self.object_id.to_ne_bytes());
		ret[4..].copy_from_slice(&word.to_ne_bytes());
		ret
	}

	pub fn validate(&self) -> Result<()> {
		let size = self.size as usize;

		if size < HEADER_SIZE || size % 4 != 0 || size > MAX_MESSAGE_SIZE {
			return Err(Error::InvalidSize {
				object_id: self.object_id,
				size,
			});
		}

		Ok(())
	}
}

pub struct Message<T> {
	pub object_id: u32,
	pub op: u16,
	pub args: T,
}

impl<T: serde::Serialize> Message<T> {
	pub fn to_vec(&self) -> Result<Vec<u8>> {
		let args = crate::encode::to_vec(&self.args)?;
		let size = HEADER_SIZE + args.len();

		let header = Header {
			object_id: self.object_id,
			op: self.op,
			size: size as u16,
		};

		if size > MAX_MESSAGE_SIZE {
			return Err(Error::InvalidSize {
				object_id: self.object_id,
				size,
			});
		}

		let mut ret = Vec::with_capacity(size);
		ret.extend(header.to_bytes());
		ret.extend(args);

		Ok(ret)
	}
}

/// A complete message as received, arguments still encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
	pub object_id: u32,
	pub op: u16,
	pub args: Vec<u8>,
}

impl RawMessage {
	pub fn decode<'a, T: serde::Deserialize<'a>>(&'a self) -> Result<T> {
		crate::decode::from_slice(&self.args)
	}

	pub fn size(&self) -> usize {
		HEADER_SIZE + self.args.len()
	}
}
