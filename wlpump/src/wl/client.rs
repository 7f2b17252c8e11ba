use crate::{wl, Result};

/// Client-side object table. Ids are handed out from 2 upward, and an id only
/// becomes reusable once the server confirms it with `delete_id`.
pub struct Client {
	objects: std::collections::HashMap<u32, Box<dyn wl::Object>>,
	free_ids: std::collections::BTreeSet<u32>,
	next_id: u32,
	globals: std::collections::BTreeMap<u32, wl::Global>,
	pending_sync: Option<u32>,
	changes: Vec<wl::Change>,
}

impl Client {
	pub fn new() -> Self {
		let mut objects = std::collections::HashMap::<u32, Box<dyn wl::Object>>::new();
		objects.insert(wl::DISPLAY_ID, Box::new(wl::Display));

		Self {
			objects,
			free_ids: Default::default(),
			next_id: wl::DISPLAY_ID + 1,
			globals: Default::default(),
			pending_sync: None,
			changes: Vec::new(),
		}
	}

	fn new_object(&mut self, object: impl FnOnce(u32) -> Box<dyn wl::Object>) -> u32 {
		let id = match self.free_ids.pop_first() {
			Some(id) => id,
			None => {
				self.next_id += 1;
				self.next_id - 1
			}
		};

		self.objects.insert(id, object(id));
		id
	}

	pub fn get_registry(&mut self) -> wlm::Message<u32> {
		let id = self.new_object(|id| Box::new(wl::Registry::new(id)));
		wl::Display::get_registry(id)
	}

	/// Starts a round trip; [`Client::is_synced`] turns true once the server
	/// answers it.
	pub fn sync(&mut self) -> wlm::Message<u32> {
		let id = self.new_object(|id| Box::new(wl::Callback::new(id)));
		self.pending_sync = Some(id);

		wl::Display::sync(id)
	}

	pub fn is_synced(&self) -> bool {
		self.pending_sync.is_none()
	}

	pub fn globals(&self) -> impl Iterator<Item = &wl::Global> {
		self.globals.values()
	}

	pub fn interface_of(&self, id: u32) -> Option<&'static str> {
		self.objects.get(&id).map(|x| x.interface())
	}

	pub fn dispatch(&mut self, message: &wlm::RawMessage) -> Result<()> {
		let Some(object) = self.objects.get_mut(&message.object_id) else {
			color_eyre::eyre::bail!("unknown object '{}'", message.object_id);
		};

		log::trace!(
			"{}@{} op {} ({} bytes)",
			object.interface(),
			message.object_id,
			message.op,
			message.args.len()
		);

		object.handle(message.op, &message.args, &mut self.changes)?;

		for change in std::mem::take(&mut self.changes) {
			self.apply(change);
		}

		Ok(())
	}

	fn apply(&mut self, change: wl::Change) {
		match change {
			wl::Change::DeleteId(id) => {
				if id == wl::DISPLAY_ID || self.objects.remove(&id).is_none() {
					log::warn!("server deleted unknown id {id}");
					return;
				}

				self.free_ids.insert(id);
			}
			wl::Change::GlobalAdded(global) => {
				log::info!("global {} {} v{}", global.name, global.interface, global.version);
				self.globals.insert(global.name, global);
			}
			wl::Change::GlobalRemoved(name) => match self.globals.remove(&name) {
				Some(global) => log::info!("global {name} {} removed", global.interface),
				None => log::warn!("server removed unknown global {name}"),
			},
			wl::Change::Done { callback, data } => {
				if self.pending_sync == Some(callback) {
					log::debug!("round trip done with serial {data}");
					self.pending_sync = None;
				}
			}
		}
	}
}

impl Default for Client {
	fn default() -> Self {
		Self::new()
	}
}
