use crate::{wl, Result};

pub const DISPLAY_ID: u32 = 1;

#[derive(Debug, Default)]
pub struct Display;

impl Display {
	pub fn sync(callback: u32) -> wlm::Message<u32> {
		// https://wayland.app/protocols/wayland#wl_display:request:sync
		wlm::Message {
			object_id: DISPLAY_ID,
			op: 0,
			args: callback,
		}
	}

	pub fn get_registry(registry: u32) -> wlm::Message<u32> {
		// https://wayland.app/protocols/wayland#wl_display:request:get_registry
		wlm::Message {
			object_id: DISPLAY_ID,
			op: 1,
			args: registry,
		}
	}
}

impl wl::Object for Display {
	fn interface(&self) -> &'static str {
		"wl_display"
	}

	fn handle(&mut self, op: u16, params: &[u8], changes: &mut Vec<wl::Change>) -> Result<()> {
		match op {
			0 => {
				let (object_id, code, message): (u32, u32, &str) = wlm::decode::from_slice(params)?;

				color_eyre::eyre::bail!("server error on object {object_id} (code {code}): {message}");
			}
			1 => {
				let id: u32 = wlm::decode::from_slice(params)?;
				changes.push(wl::Change::DeleteId(id));
			}
			_ => color_eyre::eyre::bail!("unknown op '{op}' in Display"),
		}

		Ok(())
	}
}
