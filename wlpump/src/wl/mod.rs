mod callback;
mod client;
mod display;
mod registry;

pub use callback::*;
pub use client::*;
pub use display::*;
pub use registry::*;

use crate::Result;

pub trait Object {
	fn interface(&self) -> &'static str;

	/// Decodes one event. Anything that touches other objects goes into
	/// `changes` and is applied by the [`Client`] afterwards.
	fn handle(&mut self, op: u16, params: &[u8], changes: &mut Vec<Change>) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
	DeleteId(u32),
	GlobalAdded(Global),
	GlobalRemoved(u32),
	Done { callback: u32, data: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Global {
	pub name: u32,
	pub interface: String,
	pub version: u32,
}
