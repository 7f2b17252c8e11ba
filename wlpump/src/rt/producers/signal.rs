use std::os::fd::{AsFd as _, AsRawFd as _};

use crate::{
	rt::{Producer, Readiness},
	Result,
};

/// Delivers process signals through the runtime instead of async handlers.
pub struct Signals(nix::sys::signalfd::SignalFd);

impl Signals {
	/// Blocks `signals` for the calling thread; they are only observable
	/// through this producer afterwards.
	pub fn new(signals: &[nix::sys::signal::Signal]) -> Result<Self> {
		let mut mask = nix::sys::signal::SigSet::empty();

		for &signal in signals {
			mask.add(signal);
		}

		mask.thread_block()?;

		Ok(Self(nix::sys::signalfd::SignalFd::with_flags(
			&mask,
			nix::sys::signalfd::SfdFlags::SFD_NONBLOCK | nix::sys::signalfd::SfdFlags::SFD_CLOEXEC,
		)?))
	}
}

impl Producer for Signals {
	type Message<'a> = nix::sys::signal::Signal;
	type Ret = Result<()>;

	fn fd(&self) -> std::os::fd::RawFd {
		self.0.as_fd().as_raw_fd()
	}

	fn call(
		&mut self,
		_readiness: Readiness,
		callback: &mut impl FnMut(Self::Message<'_>) -> Self::Ret,
	) -> Result<std::ops::ControlFlow<()>> {
		while let Some(info) = self.0.read_signal()? {
			let signal = nix::sys::signal::Signal::try_from(info.ssi_signo as i32)?;
			callback(signal)?;
		}

		Ok(std::ops::ControlFlow::Continue(()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn blocked_signal_is_delivered_as_message() {
		let signal = nix::sys::signal::Signal::SIGUSR1;
		let mut signals = Signals::new(&[signal]).unwrap();

		nix::sys::signal::raise(signal).unwrap();

		let mut seen = Vec::new();
		let ret = signals
			.call(
				Readiness {
					readable: true,
					writable: false,
				},
				&mut |x| {
					seen.push(x);
					Ok(())
				},
			)
			.unwrap();

		assert_eq!(ret, std::ops::ControlFlow::Continue(()));
		assert_eq!(seen, [signal]);
	}
}
