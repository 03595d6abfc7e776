//! Raw layouts and constants of the `sharc` (portable) and `sharcfb` (native)
//! shader archive formats.

mod defs;
mod layout;

pub use defs::*;
pub use layout::*;
