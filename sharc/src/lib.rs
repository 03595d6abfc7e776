//! Zero-copy loading of precompiled shader archives.
//!
//! Archives are loaded in place: the caller owns a 4-byte aligned blob, the
//! loader brings it into host byte order, and every accessor borrows from it.
//! Binary archives additionally resolve their native payload offsets into a
//! [`RelocationTable`]. Programs address their precompiled variants through a
//! [`VariationSpace`].

mod archive;
mod binary;
mod config;
mod endian;
mod enums;
mod error;
mod logger;
mod native;
mod object;
mod program;
mod relocation;
mod res;
mod signature;
mod variation;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use archive::*;
pub use binary::*;
pub use config::*;
pub use endian::{needs_swap, swap_words, Endian};
pub use enums::*;
pub use error::*;
pub use native::*;
pub use object::*;
pub use program::*;
pub use relocation::*;
pub use res::*;
pub use signature::*;
pub use variation::*;

pub use sharc_sys::{NO_INDEX, POINTERS_RESOLVED};

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn resolved_archives_are_shareable() {
        assert_send_sync::<ShaderArchive<'static>>();
        assert_send_sync::<FixedBinaryShaderArchive<'static>>();
        assert_send_sync::<VariationSpace<'static>>();
        assert_send_sync::<ResArray<'static, ShaderProgram<'static>>>();
    }
}
