mod interest;
pub mod producers;
mod runtime;

pub use interest::*;
pub use producers::Producer;
pub use runtime::*;
