use std::os::fd::{AsRawFd as _, FromRawFd as _};

use nix::sys::socket;

/// Most fds libwayland passes in one message.
pub const MAX_FDS: usize = 28;

/// The raw non-blocking socket under a [`crate::Connection`].
pub trait Transport {
	fn fd(&self) -> std::os::fd::RawFd;

	/// One non-blocking receive. Fds passed alongside the bytes are appended
	/// to `fds`.
	fn recv(
		&mut self,
		buf: &mut [u8],
		fds: &mut std::collections::VecDeque<std::os::fd::OwnedFd>,
	) -> std::io::Result<usize>;

	/// One non-blocking send, `fds` travel with the first byte.
	fn send(&mut self, buf: &[u8], fds: &[std::os::fd::RawFd]) -> std::io::Result<usize>;

	fn shutdown(&mut self) -> std::io::Result<()>;
}

impl Transport for std::os::unix::net::UnixStream {
	fn fd(&self) -> std::os::fd::RawFd {
		self.as_raw_fd()
	}

	fn recv(
		&mut self,
		buf: &mut [u8],
		fds: &mut std::collections::VecDeque<std::os::fd::OwnedFd>,
	) -> std::io::Result<usize> {
		let mut cmsg_buffer = nix::cmsg_space!([std::os::fd::RawFd; MAX_FDS]);
		let mut iov = [std::io::IoSliceMut::new(buf)];

		let msg = socket::recvmsg::<()>(
			self.as_raw_fd(),
			&mut iov,
			Some(&mut cmsg_buffer),
			socket::MsgFlags::MSG_DONTWAIT | socket::MsgFlags::MSG_CMSG_CLOEXEC,
		)?;

		for cmsg in msg.cmsgs() {
			let socket::ControlMessageOwned::ScmRights(received) = cmsg else {
				continue;
			};

			// the kernel installed these in our table, we are their only owner
			fds.extend(
				received
					.into_iter()
					.map(|fd| unsafe { std::os::fd::OwnedFd::from_raw_fd(fd) }),
			);
		}

		// the kernel closes whatever did not fit, so those fds are gone for good
		if msg.flags.contains(socket::MsgFlags::MSG_CTRUNC) {
			log::warn!("more than {MAX_FDS} fds in one read on fd {}", self.as_raw_fd());

			return Err(std::io::Error::new(
				std::io::ErrorKind::InvalidData,
				format!("more than {MAX_FDS} fds passed in one message"),
			));
		}

		Ok(msg.bytes)
	}

	fn send(&mut self, buf: &[u8], fds: &[std::os::fd::RawFd]) -> std::io::Result<usize> {
		let iov = [std::io::IoSlice::new(buf)];
		let rights = [socket::ControlMessage::ScmRights(fds)];
		let cmsgs: &[socket::ControlMessage] = if fds.is_empty() { &[] } else { &rights };

		Ok(socket::sendmsg::<()>(
			self.as_raw_fd(),
			&iov,
			cmsgs,
			socket::MsgFlags::MSG_DONTWAIT | socket::MsgFlags::MSG_NOSIGNAL,
			None,
		)?)
	}

	fn shutdown(&mut self) -> std::io::Result<()> {
		match std::os::unix::net::UnixStream::shutdown(self, std::net::Shutdown::Both) {
			Err(x) if x.kind() == std::io::ErrorKind::NotConnected => Ok(()),
			x => x,
		}
	}
}
