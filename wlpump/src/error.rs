#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
	#[error("XDG_RUNTIME_DIR is not set")]
	NoRuntimeDir,

	#[error("WAYLAND_SOCKET is not a file descriptor: {0:?}")]
	InvalidSocketFd(String),

	#[error("failed to connect to '{}'", path.display())]
	Connect {
		path: std::path::PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("failed to configure the display socket")]
	Configure(#[source] std::io::Error),
}

/// Fatal for the channel; the pump closes when it sees one.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
	#[error("server closed the connection")]
	Disconnected,

	#[error("channel i/o failed: {0}")]
	Io(#[from] std::io::Error),

	#[error("malformed message: {0}")]
	Protocol(#[from] wlm::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PrepareError {
	#[error("a read is already prepared on this channel")]
	AlreadyPending,

	#[error("{0} messages are still waiting to be dispatched")]
	QueueNotEmpty(usize),
}
