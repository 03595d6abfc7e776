use bitflags::bitflags;

pub use sharc_sys::{ShaderStage, SymbolCategory};

bitflags! {
    /// The shader stages a reflection symbol applies to.
    #[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct StageFlags: u32 {
        const VERTEX = 1 << ShaderStage::Vertex as u32;
        const FRAGMENT = 1 << ShaderStage::Fragment as u32;
        const GEOMETRY = 1 << ShaderStage::Geometry as u32;
    }
}

impl From<ShaderStage> for StageFlags {
    fn from(value: ShaderStage) -> Self {
        match value {
            ShaderStage::Vertex => StageFlags::VERTEX,
            ShaderStage::Fragment => StageFlags::FRAGMENT,
            ShaderStage::Geometry => StageFlags::GEOMETRY,
        }
    }
}
