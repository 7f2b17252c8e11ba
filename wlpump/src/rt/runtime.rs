use std::os::fd::{AsFd as _, AsRawFd as _};

use crate::{
	rt::{Interest, Producer, Readiness},
	Result,
};

struct Caller<T: Producer, U, V: FnMut(T::Message<'_>, &mut U, &mut Runtime<U>) -> T::Ret> {
	producer: T,
	callback: V,
	_phantom: std::marker::PhantomData<U>,
}

struct Registration<V> {
	callback: V,
}

trait CallerWrapper<T> {
	fn call(
		&mut self,
		readiness: Readiness,
		state: &mut T,
		rt: &mut Runtime<T>,
	) -> Result<std::ops::ControlFlow<()>>;

	/// `None` keeps the mask the fd was registered with.
	fn interest(&self) -> Option<Interest>;

	fn cancel(&mut self);
}

impl<T: Producer, U, V: FnMut(T::Message<'_>, &mut U, &mut Runtime<U>) -> T::Ret> CallerWrapper<U>
	for Caller<T, U, V>
{
	fn call(
		&mut self,
		readiness: Readiness,
		state: &mut U,
		rt: &mut Runtime<U>,
	) -> Result<std::ops::ControlFlow<()>> {
		self.producer
			.call(readiness, &mut |event| (self.callback)(event, state, rt))
	}

	fn interest(&self) -> Option<Interest> {
		Some(self.producer.interest())
	}

	fn cancel(&mut self) {
		self.producer.cancel();
	}
}

impl<U, V: FnMut(Readiness, &mut U, &mut Runtime<U>) -> Result<std::ops::ControlFlow<()>>>
	CallerWrapper<U> for Registration<V>
{
	fn call(
		&mut self,
		readiness: Readiness,
		state: &mut U,
		rt: &mut Runtime<U>,
	) -> Result<std::ops::ControlFlow<()>> {
		(self.callback)(readiness, state, rt)
	}

	fn interest(&self) -> Option<Interest> {
		None
	}

	fn cancel(&mut self) {}
}

struct Entry<State> {
	interest: Interest,
	caller: std::rc::Rc<std::cell::RefCell<dyn CallerWrapper<State>>>,
}

/// A `poll(2)` loop over registered fds. Callbacks run one at a time and get
/// the runtime back, so they can change registrations or stop the loop.
pub struct Runtime<State> {
	map: std::collections::HashMap<std::os::fd::RawFd, Entry<State>>,
	stopped: bool,
}

impl<State: 'static> Runtime<State> {
	pub fn new() -> Self {
		Self {
			map: Default::default(),
			stopped: false,
		}
	}

	/// Registers a producer. Its mask is re-read after every call, and it is
	/// dropped once it returns `Break`.
	pub fn on<T: Producer + 'static>(
		&mut self,
		producer: T,
		callback: impl FnMut(T::Message<'_>, &mut State, &mut Self) -> T::Ret + 'static,
	) {
		let fd = producer.fd();
		let interest = producer.interest();

		let a = Caller {
			producer,
			callback,
			_phantom: std::marker::PhantomData::<State>,
		};

		self.insert(fd, interest, std::rc::Rc::new(std::cell::RefCell::new(a)));
	}

	/// Registers a bare fd; `callback` does its own I/O.
	pub fn register(
		&mut self,
		fd: std::os::fd::RawFd,
		interest: Interest,
		callback: impl FnMut(Readiness, &mut State, &mut Self) -> Result<std::ops::ControlFlow<()>>
			+ 'static,
	) {
		let a = Registration { callback };

		self.insert(fd, interest, std::rc::Rc::new(std::cell::RefCell::new(a)));
	}

	fn insert(
		&mut self,
		fd: std::os::fd::RawFd,
		interest: Interest,
		caller: std::rc::Rc<std::cell::RefCell<dyn CallerWrapper<State>>>,
	) {
		log::debug!("watching fd {fd} for {interest:?}");

		if let Some(old) = self.map.insert(fd, Entry { interest, caller }) {
			log::warn!("fd {fd} was registered twice, dropping the old registration");
			cancel(old);
		}
	}

	pub fn modify_interest(&mut self, fd: std::os::fd::RawFd, interest: Interest) -> Result<()> {
		let Some(entry) = self.map.get_mut(&fd) else {
			color_eyre::eyre::bail!("fd {fd} is not registered");
		};

		if entry.interest != interest {
			log::trace!("fd {fd} interest {:?} -> {interest:?}", entry.interest);
			entry.interest = interest;
		}

		Ok(())
	}

	/// Removes a registration, cancelling its producer first.
	pub fn unregister(&mut self, fd: std::os::fd::RawFd) -> bool {
		let Some(entry) = self.map.remove(&fd) else {
			return false;
		};

		log::debug!("stopped watching fd {fd}");
		cancel(entry);

		true
	}

	/// Makes `run` return once the current callback finishes.
	pub fn stop(&mut self) {
		self.stopped = true;
	}

	pub fn is_registered(&self, fd: std::os::fd::RawFd) -> bool {
		self.map.contains_key(&fd)
	}

	pub fn interest(&self, fd: std::os::fd::RawFd) -> Option<Interest> {
		self.map.get(&fd).map(|x| x.interest)
	}

	/// Runs until stopped, until nothing is registered, or until a callback
	/// fails.
	pub fn run(&mut self, state: &mut State) -> Result<()> {
		self.stopped = false;

		while !self.stopped && !self.map.is_empty() {
			let mut fds = self
				.map
				.iter()
				.map(|(&fd, entry)| {
					nix::poll::PollFd::new(
						unsafe { std::os::fd::BorrowedFd::borrow_raw(fd) },
						entry.interest.poll_flags(),
					)
				})
				.collect::<Vec<_>>();

			match nix::poll::poll(&mut fds, nix::poll::PollTimeout::NONE) {
				Ok(_) => {}
				Err(nix::errno::Errno::EINTR) => continue,
				Err(x) => return Err(x.into()),
			}

			let ready = fds
				.iter()
				.filter_map(|x| Some((x.as_fd().as_raw_fd(), x.revents()?)))
				.filter(|(_, revents)| !revents.is_empty())
				.collect::<Vec<_>>();

			for (fd, revents) in ready {
				if revents.contains(nix::poll::PollFlags::POLLNVAL) {
					color_eyre::eyre::bail!("fd {fd} was closed while registered");
				}

				// an earlier callback this round may have unregistered it
				let Some(entry) = self.map.get(&fd) else {
					continue;
				};

				let caller = std::rc::Rc::clone(&entry.caller);
				let ret = caller
					.borrow_mut()
					.call(Readiness::from(revents), state, self)?;

				let current = self
					.map
					.get_mut(&fd)
					.filter(|x| std::rc::Rc::ptr_eq(&x.caller, &caller));

				match (ret, current) {
					(std::ops::ControlFlow::Continue(_), Some(entry)) => {
						if let Some(interest) = caller.borrow().interest() {
							if entry.interest != interest {
								log::trace!("fd {fd} interest {:?} -> {interest:?}", entry.interest);
								entry.interest = interest;
							}
						}
					}
					(std::ops::ControlFlow::Break(_), Some(_)) => {
						log::debug!("fd {fd} is done");
						self.map.remove(&fd);
					}
					(_, None) => {}
				}

				if self.stopped {
					break;
				}
			}
		}

		Ok(())
	}
}

impl<State: 'static> Default for Runtime<State> {
	fn default() -> Self {
		Self::new()
	}
}

fn cancel<State>(entry: Entry<State>) {
	// a producer unregistering itself is still borrowed here; it goes away
	// when its call returns and the last handle drops
	if let Ok(mut caller) = entry.caller.try_borrow_mut() {
		caller.cancel();
	}
}

impl<State> Drop for Runtime<State> {
	fn drop(&mut self) {
		for (_, entry) in self.map.drain() {
			cancel(entry);
		}
	}
}
