//! Wayland wire format: message framing and a serde codec for argument lists.

pub mod decode;
pub mod encode;
mod error;
mod frame;
mod message;

pub use error::{Error, Result};
pub use frame::drain_frames;
pub use message::*;
