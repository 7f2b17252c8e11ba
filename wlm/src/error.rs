pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("{0}")]
	Message(String),

	#[error("message truncated: needed {needed} more bytes")]
	Truncated { needed: usize },

	#[error("{0} trailing bytes after arguments")]
	TrailingData(usize),

	#[error("{0} is not a wayland argument type")]
	Unsupported(&'static str),

	#[error("invalid message size {size} for object {object_id}")]
	InvalidSize { object_id: u32, size: usize },

	#[error("string argument is not valid utf-8")]
	InvalidString(#[from] std::str::Utf8Error),
}

impl serde::ser::Error for Error {
	fn custom<T>(msg: T) -> Self
	where
		T: std::fmt::Display,
	{
		Self::Message(msg.to_string())
	}
}

impl serde::de::Error for Error {
	fn custom<T>(msg: T) -> Self
	where
		T: std::fmt::Display,
	{
		Self::Message(msg.to_string())
	}
}
