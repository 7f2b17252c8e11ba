//! Drives a [`Connection`] from readiness notifications.
//!
//! The pump keeps a read prepared whenever it is idle, so a readable signal
//! always has a token to spend. After every drain it prepares the next read,
//! and it only asks for writability while the outbox holds data. Replies
//! queued by handlers wait for the write path.

use crate::{
	connection::{Connection, FlushOutcome, Incoming, ReadOutcome, ReadToken},
	error::{ChannelError, PrepareError},
	rt::Interest,
	transport::Transport,
	Result,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
	Idle,
	AwaitingRead,
	Draining,
	Closed,
}

pub enum Event<'a> {
	Message(Incoming<'a>),
	/// Sent once, when the channel fails.
	Closed(&'a ChannelError),
}

pub struct Pump<T: Transport> {
	connection: Connection<T>,
	state: State,
	token: Option<ReadToken>,
}

impl<T: Transport> Pump<T> {
	pub fn new(connection: Connection<T>) -> Result<Self> {
		let mut pump = Self {
			connection,
			state: State::Idle,
			token: None,
		};

		pump.token = Some(pump.prepare()?);
		pump.state = State::AwaitingRead;

		Ok(pump)
	}

	pub fn fd(&self) -> std::os::fd::RawFd {
		self.connection.fd()
	}

	pub fn state(&self) -> State {
		self.state
	}

	pub fn connection(&self) -> &Connection<T> {
		&self.connection
	}

	pub fn interest(&self) -> Interest {
		match self.state {
			State::Closed => Interest::NONE,
			_ if self.connection.outbox().is_empty() => Interest::READABLE,
			_ => Interest::READABLE | Interest::WRITABLE,
		}
	}

	/// Queues a request. Returns `true` when the outbox was empty before, i.e.
	/// the loop now has to watch for writability.
	pub fn submit<U: serde::Serialize>(&mut self, message: wlm::Message<U>) -> Result<bool> {
		if self.state == State::Closed {
			color_eyre::eyre::bail!("cannot submit on closed channel fd {}", self.fd());
		}

		let was_empty = self.connection.outbox().is_empty();
		self.connection.submit(message)?;

		Ok(was_empty)
	}

	pub fn submit_fd(&mut self, fd: std::os::fd::OwnedFd) -> Result<()> {
		if self.state == State::Closed {
			color_eyre::eyre::bail!("cannot submit on closed channel fd {}", self.fd());
		}

		self.connection.submit_fd(fd);
		Ok(())
	}

	pub fn on_readable(&mut self, callback: &mut impl FnMut(Event<'_>) -> Result<()>) -> Result<()> {
		if self.state == State::Closed {
			return Ok(());
		}

		// only after a handler failed mid-drain; finish that drain first
		let token = match self.token.take() {
			Some(token) => token,
			None => {
				self.dispatch(callback)?;
				self.prepare()?
			}
		};

		self.state = State::Draining;

		match self.connection.read_pending(token) {
			ReadOutcome::Decoded(count) => log::trace!("decoded {count} messages"),
			ReadOutcome::WouldBlock => log::trace!("nothing to read on fd {}", self.fd()),
			ReadOutcome::Failed(x) => return self.fail(x, callback),
		}

		self.dispatch(callback)?;
		self.state = State::Idle;

		self.token = Some(self.prepare()?);
		self.state = State::AwaitingRead;

		Ok(())
	}

	pub fn on_writable(&mut self, callback: &mut impl FnMut(Event<'_>) -> Result<()>) -> Result<()> {
		if self.state == State::Closed || self.connection.outbox().is_empty() {
			return Ok(());
		}

		match self.connection.flush() {
			FlushOutcome::Complete => log::trace!("outbox of fd {} drained", self.fd()),
			FlushOutcome::WouldBlock => log::trace!(
				"{} bytes still queued on fd {}",
				self.connection.outbox().len(),
				self.fd()
			),
			FlushOutcome::Failed(x) => return self.fail(x, callback),
		}

		Ok(())
	}

	/// Closes the channel without notifying anyone.
	pub fn shutdown(&mut self) {
		if self.state == State::Closed {
			return;
		}

		log::debug!("shutting down channel fd {}", self.fd());
		self.teardown();
	}

	fn prepare(&mut self) -> Result<ReadToken> {
		match self.connection.prepare_read() {
			Ok(token) => Ok(token),
			Err(PrepareError::AlreadyPending) => {
				panic!("read prepared twice on channel fd {}", self.fd())
			}
			Err(x) => Err(x.into()),
		}
	}

	fn dispatch(&mut self, callback: &mut impl FnMut(Event<'_>) -> Result<()>) -> Result<()> {
		let count = self
			.connection
			.dispatch_queued(&mut |incoming| callback(Event::Message(incoming)))?;

		if count > 0 {
			log::trace!("dispatched {count} messages from fd {}", self.fd());
		}

		Ok(())
	}

	fn fail(
		&mut self,
		error: ChannelError,
		callback: &mut impl FnMut(Event<'_>) -> Result<()>,
	) -> Result<()> {
		log::warn!("closing channel fd {}: {error}", self.fd());

		self.teardown();
		callback(Event::Closed(&error))
	}

	// token goes back before the socket is shut down
	fn teardown(&mut self) {
		if let Some(token) = self.token.take() {
			self.connection.cancel_read(token);
		}

		self.state = State::Closed;

		if let Err(x) = self.connection.close() {
			log::debug!("shutdown of fd {} failed: {x}", self.fd());
		}
	}
}

impl<T: Transport> Drop for Pump<T> {
	fn drop(&mut self) {
		self.shutdown();
	}
}

#[cfg(test)]
mod tests {
	use assert_matches::assert_matches;

	use super::*;
	use crate::testutil::{self, ScriptedTransport};

	#[derive(Default)]
	struct Recorder {
		callbacks: Vec<u32>,
		closed: usize,
		reply: bool,
	}

	impl Recorder {
		fn handle(&mut self, event: Event<'_>) -> Result<()> {
			match event {
				Event::Message(incoming) => {
					let callback: u32 = incoming.message.decode()?;
					self.callbacks.push(callback);

					if self.reply {
						incoming.outbox.push(wlm::Message {
							object_id: callback,
							op: 0,
							args: 0u32,
						})?;
					}
				}
				Event::Closed(_) => self.closed += 1,
			}

			Ok(())
		}
	}

	fn pump() -> (Pump<ScriptedTransport>, ScriptedTransport) {
		let transport = ScriptedTransport::default();
		let pump = Pump::new(Connection::new(transport.clone())).unwrap();

		(pump, transport)
	}

	#[test]
	fn new_pump_holds_the_only_token() {
		let (mut pump, _) = pump();

		assert_eq!(pump.state(), State::AwaitingRead);
		assert!(pump.connection().has_prepared_read());
		assert_matches!(
			pump.connection.prepare_read(),
			Err(PrepareError::AlreadyPending)
		);
	}

	#[test]
	fn three_submits_one_writable() {
		let (mut pump, transport) = pump();
		let mut recorder = Recorder::default();

		assert!(pump.submit(wlm::Message { object_id: 1, op: 1, args: 2u32 }).unwrap());
		assert!(!pump.submit(wlm::Message { object_id: 1, op: 0, args: 3u32 }).unwrap());
		assert!(!pump.submit(wlm::Message { object_id: 1, op: 0, args: 4u32 }).unwrap());

		assert_eq!(pump.interest(), Interest::READABLE | Interest::WRITABLE);

		pump.on_writable(&mut |x| recorder.handle(x)).unwrap();

		assert!(pump.connection().outbox().is_empty());
		assert_eq!(pump.interest(), Interest::READABLE);
		assert_eq!(transport.sent().len(), 36);
		assert_eq!(transport.send_calls(), 1);
	}

	#[test]
	fn writable_with_empty_outbox_does_nothing() {
		let (mut pump, transport) = pump();
		let mut recorder = Recorder::default();

		pump.on_writable(&mut |x| recorder.handle(x)).unwrap();
		pump.on_writable(&mut |x| recorder.handle(x)).unwrap();

		assert_eq!(transport.send_calls(), 0);
		assert_eq!(pump.interest(), Interest::READABLE);
		assert_eq!(pump.state(), State::AwaitingRead);
	}

	#[test]
	fn partial_message_rearms_without_dispatch() {
		let (mut pump, transport) = pump();
		let mut recorder = Recorder::default();

		transport.push_read(testutil::sync_message(1, 2)[..10].to_vec());

		pump.on_readable(&mut |x| recorder.handle(x)).unwrap();

		assert!(recorder.callbacks.is_empty());
		assert_eq!(pump.connection().queued(), 0);
		assert_eq!(pump.state(), State::AwaitingRead);
		assert!(pump.connection().has_prepared_read());
	}

	#[test]
	fn spurious_wakeup_rearms() {
		let (mut pump, transport) = pump();
		let mut recorder = Recorder::default();

		pump.on_readable(&mut |x| recorder.handle(x)).unwrap();

		assert_eq!(transport.recv_calls(), 1);
		assert_eq!(pump.state(), State::AwaitingRead);
		assert!(pump.connection().has_prepared_read());
	}

	#[test]
	fn fatal_read_closes_and_notifies_once() {
		let (mut pump, transport) = pump();
		let mut recorder = Recorder::default();

		transport.push_read_error(std::io::ErrorKind::PermissionDenied);
		transport.push_read(testutil::sync_message(1, 2));

		pump.on_readable(&mut |x| recorder.handle(x)).unwrap();

		assert_eq!(pump.state(), State::Closed);
		assert_eq!(recorder.closed, 1);
		assert!(!pump.connection().has_prepared_read());
		assert!(transport.is_shut_down());

		pump.on_readable(&mut |x| recorder.handle(x)).unwrap();
		pump.on_writable(&mut |x| recorder.handle(x)).unwrap();

		assert_eq!(transport.recv_calls(), 1);
		assert_eq!(recorder.closed, 1);
		assert!(recorder.callbacks.is_empty());
		assert!(!pump.connection().has_prepared_read());
		assert_eq!(pump.interest(), Interest::NONE);
		assert!(pump.submit(wlm::Message { object_id: 1, op: 0, args: 2u32 }).is_err());
	}

	#[test]
	fn fatal_write_closes_and_notifies_once() {
		let (mut pump, transport) = pump();
		let mut recorder = Recorder::default();

		transport.fail_next_send(std::io::ErrorKind::BrokenPipe);
		pump.submit(wlm::Message { object_id: 1, op: 0, args: 2u32 }).unwrap();

		pump.on_writable(&mut |x| recorder.handle(x)).unwrap();
		pump.on_writable(&mut |x| recorder.handle(x)).unwrap();

		assert_eq!(pump.state(), State::Closed);
		assert_eq!(recorder.closed, 1);
		assert_eq!(transport.send_calls(), 1);
	}

	#[test]
	fn shutdown_discards_token_silently() {
		let (mut pump, transport) = pump();
		let mut recorder = Recorder::default();

		transport.push_read(testutil::sync_message(1, 2));

		assert!(pump.connection().has_prepared_read());
		pump.shutdown();

		assert_eq!(pump.state(), State::Closed);
		assert!(!pump.connection().has_prepared_read());
		assert!(transport.is_shut_down());

		pump.on_readable(&mut |x| recorder.handle(x)).unwrap();

		assert_eq!(transport.recv_calls(), 0);
		assert_eq!(recorder.closed, 0);
		assert!(recorder.callbacks.is_empty());
	}

	#[test]
	fn replies_wait_for_the_write_path() {
		let (mut pump, transport) = pump();
		let mut recorder = Recorder {
			reply: true,
			..Default::default()
		};

		transport.push_read(
			[testutil::sync_message(1, 2), testutil::sync_message(1, 3)].concat(),
		);

		pump.on_readable(&mut |x| recorder.handle(x)).unwrap();

		assert_eq!(recorder.callbacks, [2, 3]);
		assert_eq!(transport.send_calls(), 0);
		assert_eq!(pump.interest(), Interest::READABLE | Interest::WRITABLE);

		pump.on_writable(&mut |x| recorder.handle(x)).unwrap();

		assert_eq!(transport.sent().len(), 24);
		assert_eq!(pump.interest(), Interest::READABLE);
	}

	#[test]
	fn interleaved_signals_deliver_everything_in_order() {
		let (mut pump, transport) = pump();
		let mut recorder = Recorder::default();

		let wire = (2..8)
			.map(|x| testutil::sync_message(1, x))
			.collect::<Vec<_>>()
			.concat();

		// arrives in odd slices, the socket takes 7 bytes per write
		for chunk in wire.chunks(13) {
			transport.push_read(chunk.to_vec());
		}

		for x in 0..4u32 {
			pump.submit(wlm::Message { object_id: 1, op: 0, args: x }).unwrap();
		}

		for _ in 0..8 {
			transport.limit_next_send(7);
		}

		for _ in 0..8 {
			pump.on_readable(&mut |x| recorder.handle(x)).unwrap();
			pump.on_writable(&mut |x| recorder.handle(x)).unwrap();
		}

		assert_eq!(recorder.callbacks, [2, 3, 4, 5, 6, 7]);
		assert_eq!(
			transport.sent(),
			(0..4u32)
				.map(|x| testutil::sync_message(1, x))
				.collect::<Vec<_>>()
				.concat()
		);
		assert_eq!(pump.interest(), Interest::READABLE);
		assert_eq!(recorder.closed, 0);
	}

	#[test]
	fn failed_handler_resumes_on_next_readable() {
		let (mut pump, transport) = pump();
		let mut seen = Vec::new();

		transport.push_read(
			[testutil::sync_message(1, 2), testutil::sync_message(1, 3)].concat(),
		);

		let ret = pump.on_readable(&mut |event| {
			let Event::Message(incoming) = event else {
				return Ok(());
			};

			let callback: u32 = incoming.message.decode()?;
			seen.push(callback);

			if callback == 2 && seen.len() == 1 {
				color_eyre::eyre::bail!("first dispatch fails");
			}

			Ok(())
		});

		assert!(ret.is_err());
		assert_eq!(pump.state(), State::Draining);
		assert!(!pump.connection().has_prepared_read());

		pump.on_readable(&mut |event| {
			if let Event::Message(incoming) = event {
				seen.push(incoming.message.decode()?);
			}

			Ok(())
		})
		.unwrap();

		assert_eq!(seen, [2, 3]);
		assert_eq!(pump.state(), State::AwaitingRead);
	}
}
