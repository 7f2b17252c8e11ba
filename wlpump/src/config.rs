use crate::{connection::DEFAULT_READ_CHUNK, Result};
use color_eyre::eyre::WrapErr as _;

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
	pub display: Option<String>,
	pub log_level: String,
	pub read_chunk: usize,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			display: None,
			log_level: String::from("info"),
			read_chunk: DEFAULT_READ_CHUNK,
		}
	}
}

impl Config {
	/// Reads `path`, or the per-user config file when `path` is `None`. Only
	/// the per-user file may be missing.
	pub fn read_from_config_file(path: Option<&std::path::Path>) -> Result<Self> {
		let config_file = match path {
			Some(path) => std::fs::read_to_string(path)
				.wrap_err_with(|| format!("failed to read config {}", path.display()))?,
			None => {
				let Some(path) = default_path(
					std::env::var_os("XDG_CONFIG_HOME"),
					std::env::var_os("HOME"),
				) else {
					return Ok(Self::default());
				};

				match std::fs::read_to_string(&path) {
					Ok(x) => x,
					Err(x) if x.kind() == std::io::ErrorKind::NotFound => String::from("{}"),
					Err(x) => {
						return Err(x)
							.wrap_err_with(|| format!("failed to read config {}", path.display()))
					}
				}
			}
		};

		Self::parse(&config_file)
	}

	pub fn parse(config_file: &str) -> Result<Self> {
		let config: Self = serde_json::from_str(config_file)?;

		if config.read_chunk == 0 {
			color_eyre::eyre::bail!("read_chunk has to be at least 1 byte");
		}

		Ok(config)
	}
}

pub fn default_path(
	config_home: Option<std::ffi::OsString>,
	home: Option<std::ffi::OsString>,
) -> Option<std::path::PathBuf> {
	let base = match config_home.filter(|x| std::path::Path::new(x).is_absolute()) {
		Some(x) => std::path::PathBuf::from(x),
		None => std::path::PathBuf::from(home?).join(".config"),
	};

	Some(base.join("wlpump").join("config.json"))
}
