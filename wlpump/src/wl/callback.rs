use crate::{wl, Result};

#[derive(Debug, Clone)]
pub struct Callback {
	object_id: u32,
	done: bool,
}

impl Callback {
	pub fn new(object_id: u32) -> Self {
		Self {
			object_id,
			done: false,
		}
	}
}

impl wl::Object for Callback {
	fn interface(&self) -> &'static str {
		"wl_callback"
	}

	fn handle(&mut self, op: u16, params: &[u8], changes: &mut Vec<wl::Change>) -> Result<()> {
		match op {
			0 => {
				if self.done {
					color_eyre::eyre::bail!("callback {} fired twice", self.object_id);
				}

				let data: u32 = wlm::decode::from_slice(params)?;
				self.done = true;

				changes.push(wl::Change::Done {
					callback: self.object_id,
					data,
				});
			}
			_ => color_eyre::eyre::bail!("unknown op '{op}' in Callback"),
		}

		Ok(())
	}
}
