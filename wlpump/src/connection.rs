use std::os::fd::{AsRawFd as _, FromRawFd as _};

use crate::{
	error::{ChannelError, ConnectError, PrepareError},
	transport::{Transport, MAX_FDS},
	Result,
};

pub const DEFAULT_READ_CHUNK: usize = 4096;

/// Permission to issue exactly one read on a [`Connection`].
#[must_use]
#[derive(Debug)]
pub struct ReadToken {
	_private: (),
}

#[must_use]
#[derive(Debug)]
pub enum ReadOutcome {
	/// Complete messages moved to the dispatch queue, possibly zero.
	Decoded(usize),
	WouldBlock,
	Failed(ChannelError),
}

#[must_use]
#[derive(Debug)]
pub enum FlushOutcome {
	Complete,
	WouldBlock,
	Failed(ChannelError),
}

/// Serialized requests waiting for the socket to accept them.
#[derive(Debug, Default)]
pub struct Outbox {
	data: Vec<u8>,
	fds: Vec<std::os::fd::OwnedFd>,
}

impl Outbox {
	pub fn push<T: serde::Serialize>(&mut self, message: wlm::Message<T>) -> Result<()> {
		self.data.extend(message.to_vec()?);
		Ok(())
	}

	pub fn push_raw(&mut self, bytes: &[u8]) {
		self.data.extend_from_slice(bytes);
	}

	/// Queues an fd for the next write; push it before the message that
	/// carries it.
	pub fn push_fd(&mut self, fd: std::os::fd::OwnedFd) {
		self.fds.push(fd);
	}

	pub fn is_empty(&self) -> bool {
		self.data.is_empty()
	}

	pub fn len(&self) -> usize {
		self.data.len()
	}
}

/// A message handed to a dispatch handler, with room to queue replies.
pub struct Incoming<'a> {
	pub message: wlm::RawMessage,
	pub outbox: &'a mut Outbox,
	pub fds: &'a mut std::collections::VecDeque<std::os::fd::OwnedFd>,
}

pub struct Connection<T> {
	transport: T,
	inbound: Vec<u8>,
	queue: std::collections::VecDeque<wlm::RawMessage>,
	fds: std::collections::VecDeque<std::os::fd::OwnedFd>,
	outbox: Outbox,
	read_chunk: usize,
	read_prepared: bool,
}

impl Connection<std::os::unix::net::UnixStream> {
	/// Connects the way `wl_display_connect` does: an inherited
	/// `WAYLAND_SOCKET` first, then the named display socket.
	pub fn connect(display: Option<&str>) -> std::result::Result<Self, ConnectError> {
		let stream = match take_inherited_socket()? {
			Some(stream) => stream,
			None => {
				let path = socket_path(
					display,
					std::env::var_os("WAYLAND_DISPLAY"),
					std::env::var_os("XDG_RUNTIME_DIR"),
				)?;

				log::debug!("connecting to {}", path.display());

				std::os::unix::net::UnixStream::connect(&path)
					.map_err(|source| ConnectError::Connect { path, source })?
			}
		};

		stream
			.set_nonblocking(true)
			.map_err(ConnectError::Configure)?;

		Ok(Self::new(stream))
	}
}

fn take_inherited_socket(
) -> std::result::Result<Option<std::os::unix::net::UnixStream>, ConnectError> {
	let Some(value) = std::env::var_os("WAYLAND_SOCKET") else {
		return Ok(None);
	};

	let value = value.to_string_lossy().into_owned();
	std::env::remove_var("WAYLAND_SOCKET");

	let fd: std::os::fd::RawFd = value
		.parse()
		.map_err(|_| ConnectError::InvalidSocketFd(value.clone()))?;

	if fd < 0 {
		return Err(ConnectError::InvalidSocketFd(value));
	}

	nix::fcntl::fcntl(
		fd,
		nix::fcntl::FcntlArg::F_SETFD(nix::fcntl::FdFlag::FD_CLOEXEC),
	)
	.map_err(|x| ConnectError::Configure(x.into()))?;

	log::debug!("using inherited socket fd {fd}");

	// the parent handed this fd to us and nothing else in the process owns it
	Ok(Some(unsafe {
		std::os::unix::net::UnixStream::from_raw_fd(fd)
	}))
}

pub fn socket_path(
	display: Option<&str>,
	wayland_display: Option<std::ffi::OsString>,
	runtime_dir: Option<std::ffi::OsString>,
) -> std::result::Result<std::path::PathBuf, ConnectError> {
	let name = match display {
		Some(display) => std::path::PathBuf::from(display),
		None => wayland_display
			.map(std::path::PathBuf::from)
			.unwrap_or_else(|| std::path::PathBuf::from("wayland-0")),
	};

	if name.is_absolute() {
		return Ok(name);
	}

	let runtime_dir = runtime_dir.ok_or(ConnectError::NoRuntimeDir)?;
	Ok(std::path::PathBuf::from(runtime_dir).join(name))
}

impl<T: Transport> Connection<T> {
	pub fn new(transport: T) -> Self {
		Self {
			transport,
			inbound: Vec::new(),
			queue: Default::default(),
			fds: Default::default(),
			outbox: Default::default(),
			read_chunk: DEFAULT_READ_CHUNK,
			read_prepared: false,
		}
	}

	pub fn with_read_chunk(mut self, read_chunk: usize) -> Self {
		self.read_chunk = read_chunk.max(1);
		self
	}

	pub fn fd(&self) -> std::os::fd::RawFd {
		self.transport.fd()
	}

	pub fn transport(&self) -> &T {
		&self.transport
	}

	pub fn outbox(&self) -> &Outbox {
		&self.outbox
	}

	pub fn queued(&self) -> usize {
		self.queue.len()
	}

	pub fn received_fds(&mut self) -> &mut std::collections::VecDeque<std::os::fd::OwnedFd> {
		&mut self.fds
	}

	pub fn has_prepared_read(&self) -> bool {
		self.read_prepared
	}

	/// Registers the intent to read. Fails while another token is live, and,
	/// like `wl_display_prepare_read`, while messages are still queued.
	pub fn prepare_read(&mut self) -> std::result::Result<ReadToken, PrepareError> {
		if self.read_prepared {
			return Err(PrepareError::AlreadyPending);
		}

		if !self.queue.is_empty() {
			return Err(PrepareError::QueueNotEmpty(self.queue.len()));
		}

		self.read_prepared = true;
		Ok(ReadToken { _private: () })
	}

	pub fn cancel_read(&mut self, token: ReadToken) {
		let ReadToken { .. } = token;
		self.read_prepared = false;
	}

	pub fn read_pending(&mut self, token: ReadToken) -> ReadOutcome {
		let ReadToken { .. } = token;
		self.read_prepared = false;

		let start = self.inbound.len();
		self.inbound.resize(start + self.read_chunk, 0);

		let ret = self
			.transport
			.recv(&mut self.inbound[start..], &mut self.fds);

		let len = match ret {
			Ok(len) => len,
			Err(x) => {
				self.inbound.truncate(start);

				return match x.kind() {
					std::io::ErrorKind::WouldBlock | std::io::ErrorKind::Interrupted => {
						ReadOutcome::WouldBlock
					}
					std::io::ErrorKind::ConnectionReset => {
						ReadOutcome::Failed(ChannelError::Disconnected)
					}
					_ => ReadOutcome::Failed(x.into()),
				};
			}
		};

		self.inbound.truncate(start + len);

		if len == 0 {
			return ReadOutcome::Failed(ChannelError::Disconnected);
		}

		log::trace!("read {len} bytes from fd {}", self.fd());

		match wlm::drain_frames(&mut self.inbound, &mut self.queue) {
			Ok(count) => ReadOutcome::Decoded(count),
			Err(x) => ReadOutcome::Failed(x.into()),
		}
	}

	/// Hands queued messages to `handler` in arrival order. A handler error
	/// stops dispatch; later messages stay queued.
	pub fn dispatch_queued(
		&mut self,
		handler: &mut impl FnMut(Incoming<'_>) -> Result<()>,
	) -> Result<usize> {
		let mut count = 0;

		while let Some(message) = self.queue.pop_front() {
			handler(Incoming {
				message,
				outbox: &mut self.outbox,
				fds: &mut self.fds,
			})?;

			count += 1;
		}

		Ok(count)
	}

	/// Writes as much of the outbox as the socket takes without blocking.
	pub fn flush(&mut self) -> FlushOutcome {
		let mut sent = 0;

		let ret = loop {
			if sent == self.outbox.data.len() {
				break FlushOutcome::Complete;
			}

			let count = self.outbox.fds.len().min(MAX_FDS);
			let fds = self.outbox.fds[..count]
				.iter()
				.map(|x| x.as_raw_fd())
				.collect::<Vec<_>>();

			match self.transport.send(&self.outbox.data[sent..], &fds) {
				Ok(0) => {
					break FlushOutcome::Failed(ChannelError::Io(
						std::io::ErrorKind::WriteZero.into(),
					))
				}
				Ok(len) => {
					sent += len;
					self.outbox.fds.drain(..count);
				}
				Err(x) => match x.kind() {
					std::io::ErrorKind::WouldBlock | std::io::ErrorKind::Interrupted => {
						break FlushOutcome::WouldBlock
					}
					std::io::ErrorKind::BrokenPipe | std::io::ErrorKind::ConnectionReset => {
						break FlushOutcome::Failed(ChannelError::Disconnected)
					}
					_ => break FlushOutcome::Failed(x.into()),
				},
			}
		};

		if sent > 0 {
			log::trace!("flushed {sent} bytes to fd {}", self.fd());
		}

		self.outbox.data.drain(..sent);
		ret
	}

	pub fn submit<U: serde::Serialize>(&mut self, message: wlm::Message<U>) -> Result<()> {
		self.outbox.push(message)
	}

	pub fn submit_raw(&mut self, bytes: &[u8]) {
		self.outbox.push_raw(bytes);
	}

	pub fn submit_fd(&mut self, fd: std::os::fd::OwnedFd) {
		self.outbox.push_fd(fd);
	}

	pub fn close(&mut self) -> std::io::Result<()> {
		self.transport.shutdown()
	}
}
