//! Scripted transport for driving a connection through faults the kernel
//! won't produce on demand.

use crate::transport::Transport;

#[derive(Default)]
struct Script {
	reads: std::collections::VecDeque<std::io::Result<Vec<u8>>>,
	sends: std::collections::VecDeque<std::io::Result<usize>>,
	sent: Vec<u8>,
	recv_calls: usize,
	send_calls: usize,
	shut_down: bool,
}

/// Reads pop scripted chunks and fall back to would-block; sends accept
/// everything unless limited. Clones share the script.
#[derive(Clone, Default)]
pub struct ScriptedTransport(std::rc::Rc<std::cell::RefCell<Script>>);

impl ScriptedTransport {
	pub fn push_read(&self, bytes: Vec<u8>) {
		self.0.borrow_mut().reads.push_back(Ok(bytes));
	}

	pub fn push_read_error(&self, kind: std::io::ErrorKind) {
		self.0.borrow_mut().reads.push_back(Err(kind.into()));
	}

	pub fn limit_next_send(&self, len: usize) {
		self.0.borrow_mut().sends.push_back(Ok(len));
	}

	pub fn fail_next_send(&self, kind: std::io::ErrorKind) {
		self.0.borrow_mut().sends.push_back(Err(kind.into()));
	}

	pub fn sent(&self) -> Vec<u8> {
		self.0.borrow().sent.clone()
	}

	pub fn recv_calls(&self) -> usize {
		self.0.borrow().recv_calls
	}

	pub fn send_calls(&self) -> usize {
		self.0.borrow().send_calls
	}

	pub fn is_shut_down(&self) -> bool {
		self.0.borrow().shut_down
	}
}

impl Transport for ScriptedTransport {
	fn fd(&self) -> std::os::fd::RawFd {
		-1
	}

	fn recv(
		&mut self,
		buf: &mut [u8],
		_fds: &mut std::collections::VecDeque<std::os::fd::OwnedFd>,
	) -> std::io::Result<usize> {
		let mut script = self.0.borrow_mut();
		script.recv_calls += 1;

		let Some(next) = script.reads.pop_front() else {
			return Err(std::io::ErrorKind::WouldBlock.into());
		};

		let mut bytes = next?;

		if bytes.len() > buf.len() {
			let rest = bytes.split_off(buf.len());
			script.reads.push_front(Ok(rest));
		}

		buf[..bytes.len()].copy_from_slice(&bytes);
		Ok(bytes.len())
	}

	fn send(&mut self, buf: &[u8], _fds: &[std::os::fd::RawFd]) -> std::io::Result<usize> {
		let mut script = self.0.borrow_mut();
		script.send_calls += 1;

		let len = match script.sends.pop_front() {
			Some(limit) => limit?.min(buf.len()),
			None => buf.len(),
		};

		script.sent.extend_from_slice(&buf[..len]);

		if len == 0 {
			return Err(std::io::ErrorKind::WouldBlock.into());
		}

		Ok(len)
	}

	fn shutdown(&mut self) -> std::io::Result<()> {
		self.0.borrow_mut().shut_down = true;
		Ok(())
	}
}

/// `wl_display.sync(callback)` on the wire.
pub fn sync_message(object_id: u32, callback: u32) -> Vec<u8> {
	wlm::Message {
		object_id,
		op: 0,
		args: callback,
	}
	.to_vec()
	.unwrap()
}
