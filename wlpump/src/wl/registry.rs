use crate::{wl, Result};

#[derive(Debug, Clone)]
pub struct Registry {
	object_id: u32,
}

impl Registry {
	pub fn new(object_id: u32) -> Self {
		Self { object_id }
	}
}

impl wl::Object for Registry {
	fn interface(&self) -> &'static str {
		"wl_registry"
	}

	fn handle(&mut self, op: u16, params: &[u8], changes: &mut Vec<wl::Change>) -> Result<()> {
		match op {
			0 => {
				let (name, interface, version): (u32, &str, u32) = wlm::decode::from_slice(params)?;

				log::debug!("registry {}: global {name} {interface} v{version}", self.object_id);

				changes.push(wl::Change::GlobalAdded(wl::Global {
					name,
					interface: String::from(interface),
					version,
				}));
			}
			1 => {
				let name: u32 = wlm::decode::from_slice(params)?;
				changes.push(wl::Change::GlobalRemoved(name));
			}
			_ => color_eyre::eyre::bail!("unknown op '{op}' in Registry"),
		}

		Ok(())
	}
}
