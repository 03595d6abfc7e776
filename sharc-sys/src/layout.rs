//! Fixed-size prefixes of every region in a shader archive.
//!
//! All fields are 32-bit words. Variable-length data (names, values, native
//! payloads) follows each prefix and is never described by these structs.

use bytemuck::{Pod, Zeroable};

/// A fixed prefix that begins with its own total byte length.
pub trait SizedElement: Pod {
    fn size(&self) -> u32;
}

/// A fixed prefix that is directly followed by a padded name region.
pub trait NamedElement: SizedElement {
    fn name_len(&self) -> u32;
}

macro_rules! sized_element {
    ($($ty:ty),* $(,)?) => {
        $(impl SizedElement for $ty {
            fn size(&self) -> u32 {
                self.size
            }
        })*
    };
}

macro_rules! named_element {
    ($($ty:ty),* $(,)?) => {
        $(impl NamedElement for $ty {
            fn name_len(&self) -> u32 {
                self.name_len
            }
        })*
    };
}

#[repr(C)]
#[derive(Default, Debug, Copy, Clone, Pod, Zeroable)]
pub struct ArchiveHeader {
    pub signature: u32,
    pub version: u32,
    pub file_size: u32,
    pub byte_order: u32,
    pub name_len: u32,
}

#[repr(C)]
#[derive(Default, Debug, Copy, Clone, Pod, Zeroable)]
pub struct BinaryArchiveHeader {
    pub signature: u32,
    pub version: u32,
    pub file_size: u32,
    pub byte_order: u32,
    pub resolved: u32,
    pub name_len: u32,
}

#[repr(C)]
#[derive(Default, Debug, Copy, Clone, Pod, Zeroable)]
pub struct ArrayHeader {
    pub size: u32,
    pub count: u32,
}

#[repr(C)]
#[derive(Default, Debug, Copy, Clone, Pod, Zeroable)]
pub struct ProgramHeader {
    pub size: u32,
    pub name_len: u32,
    pub vertex_source: i32,
    pub fragment_source: i32,
    pub geometry_source: i32,
}

#[repr(C)]
#[derive(Default, Debug, Copy, Clone, Pod, Zeroable)]
pub struct MacroHeader {
    pub size: u32,
    pub name_len: u32,
    pub value_len: u32,
}

#[repr(C)]
#[derive(Default, Debug, Copy, Clone, Pod, Zeroable)]
pub struct VariationHeader {
    pub size: u32,
    pub name_len: u32,
    pub value_count: u32,
    pub values_len: u32,
    pub id_len: u32,
}

#[repr(C)]
#[derive(Default, Debug, Copy, Clone, Pod, Zeroable)]
pub struct SymbolHeader {
    pub size: u32,
    pub name_len: u32,
    pub id_len: u32,
    pub default_value_size: u32,
    /// Bit set of the stages this symbol applies to.
    pub stages: u32,
}

#[repr(C)]
#[derive(Default, Debug, Copy, Clone, Pod, Zeroable)]
pub struct SourceHeader {
    pub size: u32,
    pub name_len: u32,
    pub text_len: u32,
}

#[repr(C)]
#[derive(Default, Debug, Copy, Clone, Pod, Zeroable)]
pub struct BinaryHeader {
    pub size: u32,
    pub stage: u32,
    pub name_len: u32,
    /// Offset of the native payload from the start of this element.
    pub data_offset: u32,
    pub data_size: u32,
}

#[repr(C)]
#[derive(Default, Debug, Copy, Clone, Pod, Zeroable)]
pub struct BinaryProgramHeader {
    pub size: u32,
    pub name_len: u32,
    pub vertex_binary: i32,
    pub fragment_binary: i32,
    pub geometry_binary: i32,
}

sized_element!(
    ProgramHeader,
    MacroHeader,
    VariationHeader,
    SymbolHeader,
    SourceHeader,
    BinaryHeader,
    BinaryProgramHeader,
);

named_element!(
    ProgramHeader,
    MacroHeader,
    VariationHeader,
    SymbolHeader,
    SourceHeader,
    BinaryHeader,
    BinaryProgramHeader,
);

/// Header of a native shader payload.
///
/// Every `*_offset` is relative to the start of this header; zero means the
/// table or code block is absent.
#[repr(C)]
#[derive(Default, Debug, Copy, Clone, Pod, Zeroable)]
pub struct NativeShaderHeader {
    pub mode: u32,
    pub code_size: u32,
    pub code_offset: u32,
    /// Geometry stage only.
    pub copy_code_size: u32,
    pub copy_code_offset: u32,
    pub uniform_block_count: u32,
    pub uniform_blocks_offset: u32,
    pub uniform_var_count: u32,
    pub uniform_vars_offset: u32,
    pub initial_value_count: u32,
    pub initial_values_offset: u32,
    pub loop_var_count: u32,
    pub loop_vars_offset: u32,
    pub sampler_var_count: u32,
    pub sampler_vars_offset: u32,
    /// Vertex stage only.
    pub attrib_var_count: u32,
    pub attrib_vars_offset: u32,
}

#[repr(C)]
#[derive(Default, Debug, Copy, Clone, Pod, Zeroable)]
pub struct NativeUniformBlock {
    pub name: u32,
    pub location: u32,
    pub size: u32,
}

#[repr(C)]
#[derive(Default, Debug, Copy, Clone, Pod, Zeroable)]
pub struct NativeUniformVar {
    pub name: u32,
    pub var_type: u32,
    pub count: u32,
    pub offset: u32,
    pub block_index: i32,
}

#[repr(C)]
#[derive(Default, Debug, Copy, Clone, Pod, Zeroable)]
pub struct NativeInitialValue {
    pub value: [f32; 4],
    pub offset: u32,
}

#[repr(C)]
#[derive(Default, Debug, Copy, Clone, Pod, Zeroable)]
pub struct NativeLoopVar {
    pub offset: u32,
    pub value: u32,
}

#[repr(C)]
#[derive(Default, Debug, Copy, Clone, Pod, Zeroable)]
pub struct NativeSamplerVar {
    pub name: u32,
    pub sampler_type: u32,
    pub location: u32,
}

#[repr(C)]
#[derive(Default, Debug, Copy, Clone, Pod, Zeroable)]
pub struct NativeAttribVar {
    pub name: u32,
    pub var_type: u32,
    pub count: u32,
    pub location: u32,
}

/// A native table entry whose first word is a name offset.
pub trait NamedNativeEntry: Pod {
    fn name_offset(&self) -> u32;
}

macro_rules! named_native_entry {
    ($($ty:ty),* $(,)?) => {
        $(impl NamedNativeEntry for $ty {
            fn name_offset(&self) -> u32 {
                self.name
            }
        })*
    };
}

named_native_entry!(NativeUniformBlock, NativeUniformVar, NativeSamplerVar, NativeAttribVar);
