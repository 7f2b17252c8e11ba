pub mod config;
pub mod connection;
mod error;
pub mod pump;
pub mod rt;
#[cfg(test)]
mod testutil;
pub mod transport;
pub mod wl;

pub use config::Config;
pub use connection::Connection;
pub use error::*;
pub use pump::Pump;

pub type Result<T> = color_eyre::Result<T>;
