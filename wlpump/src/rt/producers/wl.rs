use crate::{
	pump::{Event, Pump, State},
	rt::{Interest, Producer, Readiness},
	transport::Transport,
	Result,
};

impl<T: Transport> Producer for Pump<T> {
	type Message<'a> = Event<'a>;
	type Ret = Result<()>;

	fn fd(&self) -> std::os::fd::RawFd {
		Pump::fd(self)
	}

	fn interest(&self) -> Interest {
		Pump::interest(self)
	}

	fn call(
		&mut self,
		readiness: Readiness,
		callback: &mut impl FnMut(Self::Message<'_>) -> Self::Ret,
	) -> Result<std::ops::ControlFlow<()>> {
		if readiness.readable {
			self.on_readable(callback)?;
		}

		if readiness.writable {
			self.on_writable(callback)?;
		}

		if self.state() == State::Closed {
			return Ok(std::ops::ControlFlow::Break(()));
		}

		Ok(std::ops::ControlFlow::Continue(()))
	}

	fn cancel(&mut self) {
		self.shutdown();
	}
}
