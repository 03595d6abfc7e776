use std::fmt::{Display, Formatter};

/// Packs a four character tag into a signature word.
///
/// The tag is packed little-endian, so a word-swapped tag reads back as the
/// same characters on either host once the word itself has been swapped.
pub const fn signature_word(tag: [u8; 4]) -> u32 {
    u32::from_le_bytes(tag)
}

pub const SHADER_ARCHIVE_SIGNATURE: u32 = signature_word(*b"SHAA");
pub const SHADER_ARCHIVE_VERSION: u32 = 11;

pub const BINARY_SHADER_ARCHIVE_SIGNATURE: u32 = signature_word(*b"SHBA");
pub const BINARY_SHADER_ARCHIVE_VERSION: u32 = 11;

/// Reads as this value when the archive is in host byte order.
pub const BYTE_ORDER_MARK: u32 = 0x0000_FEFF;

pub const SHADER_ARCHIVE_EXTENSION: &str = "sharc";
pub const BINARY_SHADER_ARCHIVE_EXTENSION: &str = "sharcfb";

/// Stored in place of a source or binary index when a stage is absent.
pub const NO_INDEX: i32 = -1;

/// Value of the `resolved` word once pointers have been fixed up.
pub const POINTERS_RESOLVED: u32 = 1;

#[repr(u32)]
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum ShaderStage {
    Vertex = 0,
    Fragment = 1,
    Geometry = 2,
}

impl ShaderStage {
    pub const COUNT: usize = 3;
    pub const ALL: [ShaderStage; Self::COUNT] =
        [ShaderStage::Vertex, ShaderStage::Fragment, ShaderStage::Geometry];
}

impl TryFrom<u32> for ShaderStage {
    type Error = u32;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ShaderStage::Vertex),
            1 => Ok(ShaderStage::Fragment),
            2 => Ok(ShaderStage::Geometry),
            other => Err(other),
        }
    }
}

impl Display for ShaderStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
            ShaderStage::Geometry => f.write_str("geometry"),
        }
    }
}

/// Reflection symbol categories, in the order their arrays are stored.
#[repr(u32)]
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum SymbolCategory {
    Uniform = 0,
    UniformBlock = 1,
    Sampler = 2,
    Attribute = 3,
}

impl SymbolCategory {
    pub const COUNT: usize = 4;
    pub const ALL: [SymbolCategory; Self::COUNT] = [
        SymbolCategory::Uniform,
        SymbolCategory::UniformBlock,
        SymbolCategory::Sampler,
        SymbolCategory::Attribute,
    ];

    /// Uniform blocks carry no default value payload that needs swapping.
    pub fn has_default_value(self) -> bool {
        self != SymbolCategory::UniformBlock
    }
}

impl Display for SymbolCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SymbolCategory::Uniform => f.write_str("uniform"),
            SymbolCategory::UniformBlock => f.write_str("uniform block"),
            SymbolCategory::Sampler => f.write_str("sampler"),
            SymbolCategory::Attribute => f.write_str("attribute"),
        }
    }
}
