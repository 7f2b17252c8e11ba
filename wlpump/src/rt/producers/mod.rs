mod signal;
mod wl;

pub use signal::*;

use crate::{rt::Interest, rt::Readiness, Result};

pub trait Producer {
	type Message<'a>;
	type Ret;

	fn fd(&self) -> std::os::fd::RawFd;

	/// Read after every call, so a producer can widen or narrow its own mask.
	fn interest(&self) -> Interest {
		Interest::READABLE
	}

	fn call(
		&mut self,
		readiness: Readiness,
		callback: &mut impl FnMut(Self::Message<'_>) -> Self::Ret,
	) -> Result<std::ops::ControlFlow<()>>;

	/// The runtime is letting go of this producer.
	fn cancel(&mut self) {}
}
