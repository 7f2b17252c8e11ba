use nix::poll::PollFlags;

/// What a registration wants to be woken for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Interest {
	pub readable: bool,
	pub writable: bool,
}

impl Interest {
	pub const NONE: Self = Self {
		readable: false,
		writable: false,
	};

	pub const READABLE: Self = Self {
		readable: true,
		writable: false,
	};

	pub const WRITABLE: Self = Self {
		readable: false,
		writable: true,
	};

	pub fn is_empty(&self) -> bool {
		!self.readable && !self.writable
	}

	pub(crate) fn poll_flags(&self) -> PollFlags {
		let mut ret = PollFlags::empty();

		if self.readable {
			ret |= PollFlags::POLLIN;
		}

		if self.writable {
			ret |= PollFlags::POLLOUT;
		}

		ret
	}
}

impl std::ops::BitOr for Interest {
	type Output = Self;

	fn bitor(self, rhs: Self) -> Self {
		Self {
			readable: self.readable || rhs.readable,
			writable: self.writable || rhs.writable,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Readiness {
	pub readable: bool,
	pub writable: bool,
}

impl From<PollFlags> for Readiness {
	// hang-up and error count as readable so the next read reports them
	fn from(revents: PollFlags) -> Self {
		Self {
			readable: revents
				.intersects(PollFlags::POLLIN | PollFlags::POLLHUP | PollFlags::POLLERR),
			writable: revents.contains(PollFlags::POLLOUT),
		}
	}
}
