//! Native shader payloads of a binary archive.
//!
//! A payload is a [`NativeShaderHeader`] followed by code blocks and reflection
//! tables, each addressed by an offset from the payload start. Code is opaque
//! and never swapped. Table entries and the header are whole words.

use crate::endian::Walker;
use crate::enums::ShaderStage;
use crate::error::SharcError;
use crate::object::ShaderCode;
use crate::relocation::{NativeTable, RelocField, Relocation, RelocationTable};
use crate::res::read_str;
use bytemuck::Pod;
use sharc_sys::{
    NamedNativeEntry, NativeAttribVar, NativeInitialValue, NativeLoopVar, NativeSamplerVar,
    NativeShaderHeader, NativeUniformBlock, NativeUniformVar,
};
use std::mem::size_of;
use std::ops::Deref;

impl NativeTable {
    pub(crate) const ALL: [NativeTable; 6] = [
        NativeTable::UniformBlocks,
        NativeTable::UniformVars,
        NativeTable::InitialValues,
        NativeTable::LoopVars,
        NativeTable::SamplerVars,
        NativeTable::AttribVars,
    ];

    fn entry_size(self) -> usize {
        match self {
            NativeTable::UniformBlocks => size_of::<NativeUniformBlock>(),
            NativeTable::UniformVars => size_of::<NativeUniformVar>(),
            NativeTable::InitialValues => size_of::<NativeInitialValue>(),
            NativeTable::LoopVars => size_of::<NativeLoopVar>(),
            NativeTable::SamplerVars => size_of::<NativeSamplerVar>(),
            NativeTable::AttribVars => size_of::<NativeAttribVar>(),
        }
    }

    /// `(count, offset)` as stored in `header`.
    fn extent(self, header: &NativeShaderHeader) -> (u32, u32) {
        match self {
            NativeTable::UniformBlocks => (header.uniform_block_count, header.uniform_blocks_offset),
            NativeTable::UniformVars => (header.uniform_var_count, header.uniform_vars_offset),
            NativeTable::InitialValues => (header.initial_value_count, header.initial_values_offset),
            NativeTable::LoopVars => (header.loop_var_count, header.loop_vars_offset),
            NativeTable::SamplerVars => (header.sampler_var_count, header.sampler_vars_offset),
            NativeTable::AttribVars => (header.attrib_var_count, header.attrib_vars_offset),
        }
    }

    fn applies_to(self, stage: ShaderStage) -> bool {
        self != NativeTable::AttribVars || stage == ShaderStage::Vertex
    }

    fn has_names(self) -> bool {
        !matches!(self, NativeTable::InitialValues | NativeTable::LoopVars)
    }

    /// Byte length of the table, or `None` on overflow.
    fn byte_len(self, count: u32) -> Option<usize> {
        (count as usize).checked_mul(self.entry_size())
    }
}

/// Tables present in `header` for `stage`, as `(table, count, offset)`.
fn present_tables(
    header: &NativeShaderHeader,
    stage: ShaderStage,
) -> impl Iterator<Item = (NativeTable, u32, u32)> + '_ {
    NativeTable::ALL
        .into_iter()
        .filter(move |table| table.applies_to(stage))
        .map(move |table| {
            let (count, offset) = table.extent(header);
            (table, count, offset)
        })
        .filter(|&(_, _, offset)| offset != 0)
}

/// Swaps the header and reflection tables of the payload at `payload`.
///
/// Tables may not overlap the header or each other, so no word is swapped twice.
pub(crate) fn walk_payload(
    walker: &mut Walker<'_>,
    payload: usize,
    len: usize,
    stage: ShaderStage,
) -> Result<(), SharcError> {
    let end = payload + len;
    let header: NativeShaderHeader = walker.prefix_within("native shader header", payload, end)?;
    let mut walked: Vec<(usize, usize)> = Vec::new();

    for (table, count, offset) in present_tables(&header, stage) {
        if offset % 4 != 0 {
            return Err(SharcError::UnalignedLength {
                what: "native table offset",
                offset: payload,
                len: offset,
            });
        }
        let byte_len = table.byte_len(count).ok_or(SharcError::Truncated {
            what: "native table",
            offset: payload + offset as usize,
            needed: usize::MAX,
            available: len.saturating_sub(offset as usize),
        })?;
        if byte_len == 0 {
            continue;
        }
        let start = payload + offset as usize;
        walker.ensure_within("native table", start, byte_len, end)?;

        let table_end = start + byte_len;
        let overlaps = (offset as usize) < size_of::<NativeShaderHeader>()
            || walked
                .iter()
                .any(|&(other_start, other_end)| start < other_end && other_start < table_end);
        if overlaps {
            return Err(SharcError::OverlappingTable {
                payload,
                table,
                offset,
            });
        }
        walker.words("native table", start, byte_len, end)?;
        walked.push((start, table_end));
    }

    Ok(())
}

/// Checks that `[offset, offset + len)` lies inside a payload of `payload_len` bytes.
fn within(offset: u32, len: usize, payload_len: usize) -> bool {
    offset % 4 == 0
        && (offset as usize)
            .checked_add(len)
            .is_some_and(|end| end <= payload_len)
}

/// Records the relocations of one endian-resolved payload.
///
/// `blob` must already be in host order and `payload` must have been walked.
pub(crate) fn relocate(
    blob: &[u8],
    binary: usize,
    stage: ShaderStage,
    payload: usize,
    len: usize,
    relocations: &mut RelocationTable,
) -> Result<(), SharcError> {
    let bytes = &blob[payload..payload + len];
    let header: NativeShaderHeader = bytemuck::pod_read_unaligned(&bytes[..size_of::<NativeShaderHeader>()]);
    let out_of_bounds = |field, offset| SharcError::RelocationOutOfBounds {
        binary,
        field,
        offset,
    };

    let mut code_blocks = vec![(RelocField::Code, header.code_offset, header.code_size)];
    if stage == ShaderStage::Geometry {
        code_blocks.push((RelocField::CopyCode, header.copy_code_offset, header.copy_code_size));
    }
    for (field, offset, size) in code_blocks {
        if offset == 0 {
            continue;
        }
        if !within(offset, size as usize, len) {
            return Err(out_of_bounds(field, offset));
        }
        relocations.insert(binary, field, Relocation { base: payload, offset });
    }

    for (table, count, offset) in present_tables(&header, stage) {
        let field = RelocField::Table(table);
        match table.byte_len(count) {
            Some(byte_len) if within(offset, byte_len, len) => {}
            _ => return Err(out_of_bounds(field, offset)),
        }
        relocations.insert(binary, field, Relocation { base: payload, offset });

        if !table.has_names() {
            continue;
        }
        for index in 0..count {
            // Every named entry starts with its name offset.
            let at = offset as usize + index as usize * table.entry_size();
            let name: u32 = bytemuck::pod_read_unaligned(&bytes[at..at + 4]);
            if name == 0 {
                continue;
            }
            let field = RelocField::Name(table, index);
            let terminated = bytes
                .get(name as usize..)
                .is_some_and(|rest| rest.contains(&0));
            if !terminated {
                return Err(out_of_bounds(field, name));
            }
            relocations.insert(binary, field, Relocation { base: payload, offset: name });
        }
    }

    Ok(())
}

/// A reflection table entry together with its resolved name.
#[derive(Debug, Copy, Clone)]
pub struct Named<'a, E> {
    pub name: &'a str,
    pub entry: &'a E,
}

impl<E> Deref for Named<'_, E> {
    type Target = E;

    fn deref(&self) -> &E {
        self.entry
    }
}

/// A native shader payload of a fixed-up archive.
///
/// Every offset is read through the archive's relocation table.
#[derive(Copy, Clone)]
pub struct NativeShader<'a> {
    blob: &'a [u8],
    relocations: &'a RelocationTable,
    binary: usize,
    stage: ShaderStage,
    name: &'a str,
    header: &'a NativeShaderHeader,
}

impl<'a> NativeShader<'a> {
    pub(crate) fn new(
        blob: &'a [u8],
        relocations: &'a RelocationTable,
        binary: usize,
        stage: ShaderStage,
        name: &'a str,
        payload: usize,
    ) -> Option<Self> {
        let header = blob
            .get(payload..payload.checked_add(size_of::<NativeShaderHeader>())?)
            .and_then(|bytes| bytemuck::try_from_bytes(bytes).ok())?;
        Some(NativeShader {
            blob,
            relocations,
            binary,
            stage,
            name,
            header,
        })
    }

    /// Index of this binary in the archive's binary array.
    pub fn binary_index(&self) -> usize {
        self.binary
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn name(&self) -> &'a str {
        self.name
    }

    pub fn mode(&self) -> u32 {
        self.header.mode
    }

    pub fn header(&self) -> &'a NativeShaderHeader {
        self.header
    }

    fn code_block(&self, field: RelocField, size: u32) -> Option<ShaderCode<'a>> {
        let relocation = *self.relocations.get(self.binary, field)?;
        let start = relocation.target();
        let bytes = self.blob.get(start..start + size as usize)?;
        Some(ShaderCode::new(bytes, relocation))
    }

    pub fn code(&self) -> Option<ShaderCode<'a>> {
        self.code_block(RelocField::Code, self.header.code_size)
    }

    /// The geometry copy shader, present only on geometry binaries.
    pub fn copy_code(&self) -> Option<ShaderCode<'a>> {
        self.code_block(RelocField::CopyCode, self.header.copy_code_size)
    }

    fn table<E: Pod + 'a>(&self, table: NativeTable) -> &'a [E] {
        let (count, _) = table.extent(self.header);
        let Some(start) = self.relocations.target(self.binary, RelocField::Table(table)) else {
            return &[];
        };
        let len = count as usize * size_of::<E>();
        self.blob
            .get(start..start + len)
            .and_then(|bytes| bytemuck::try_cast_slice(bytes).ok())
            .unwrap_or(&[])
    }

    fn named<E: NamedNativeEntry + 'a>(&self, table: NativeTable) -> impl Iterator<Item = Named<'a, E>> + 'a {
        let blob = self.blob;
        let relocations = self.relocations;
        let binary = self.binary;
        self.table::<E>(table)
            .iter()
            .enumerate()
            .map(move |(index, entry)| {
                let name = relocations
                    .target(binary, RelocField::Name(table, index as u32))
                    .and_then(|target| blob.get(target..))
                    .map_or("", read_str);
                Named { name, entry }
            })
    }

    pub fn uniform_blocks(&self) -> impl Iterator<Item = Named<'a, NativeUniformBlock>> + 'a {
        self.named(NativeTable::UniformBlocks)
    }

    pub fn uniform_vars(&self) -> impl Iterator<Item = Named<'a, NativeUniformVar>> + 'a {
        self.named(NativeTable::UniformVars)
    }

    pub fn sampler_vars(&self) -> impl Iterator<Item = Named<'a, NativeSamplerVar>> + 'a {
        self.named(NativeTable::SamplerVars)
    }

    /// Vertex attributes, present only on vertex binaries.
    pub fn attrib_vars(&self) -> impl Iterator<Item = Named<'a, NativeAttribVar>> + 'a {
        self.named(NativeTable::AttribVars)
    }

    pub fn initial_values(&self) -> &'a [NativeInitialValue] {
        self.table(NativeTable::InitialValues)
    }

    pub fn loop_vars(&self) -> &'a [NativeLoopVar] {
        self.table(NativeTable::LoopVars)
    }
}

impl std::fmt::Debug for NativeShader<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeShader")
            .field("binary", &self.binary)
            .field("stage", &self.stage)
            .field("name", &self.name)
            .field("mode", &self.header.mode)
            .finish()
    }
}
