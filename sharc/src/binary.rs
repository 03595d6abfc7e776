//! Binary shader archives (`.sharcfb`) carrying native GPU payloads.
//!
//! Loading moves through three phases, each its own type:
//! [`RawBinaryShaderArchive`] is untouched, [`BinaryShaderArchive`] is in host
//! byte order, and [`FixedBinaryShaderArchive`] has every payload offset
//! resolved through a [`RelocationTable`]. Fixing up consumes the resolved
//! archive, so a fixed archive cannot be fixed up again.

use crate::archive::{walk_symbols, walk_variations};
use crate::config::SetUpConfig;
use crate::endian::{self, Endian};
use crate::enums::ShaderStage;
use crate::error::SharcError;
use crate::native::{self, NativeShader};
use crate::program::{BinaryShaderProgram, ShaderBinary};
use crate::relocation::RelocationTable;
use crate::res::{nth_array, read_str, ResArray, ResElement, ResView};
use crate::variation::VariationId;
use sharc_sys::{
    BinaryArchiveHeader, BinaryHeader, BinaryProgramHeader, NativeShaderHeader, POINTERS_RESOLVED,
};
use std::mem::{offset_of, size_of};

#[derive(Debug, Copy, Clone)]
struct Layout {
    name_end: usize,
    source_endian: Endian,
}

impl Layout {
    fn header<'b>(&self, blob: &'b [u8]) -> ResView<'b, BinaryArchiveHeader> {
        ResView::new(blob)
    }

    fn name<'b>(&self, blob: &'b [u8]) -> &'b str {
        read_str(&blob[size_of::<BinaryArchiveHeader>()..self.name_end])
    }

    fn binary_array<'b>(&self, blob: &'b [u8]) -> ResArray<'b, ShaderBinary<'b>> {
        nth_array(blob, self.name_end, 0)
    }

    fn binary_program_array<'b>(&self, blob: &'b [u8]) -> ResArray<'b, BinaryShaderProgram<'b>> {
        nth_array(blob, self.name_end, 1)
    }

    fn is_pointer_resolved(&self, blob: &[u8]) -> bool {
        self.header(blob)
            .try_data()
            .is_some_and(|header| header.resolved == POINTERS_RESOLVED)
    }
}

/// A binary archive whose byte order has not been resolved yet.
pub struct RawBinaryShaderArchive<'a> {
    blob: &'a mut [u8],
}

impl<'a> RawBinaryShaderArchive<'a> {
    pub fn new(blob: &'a mut [u8]) -> Self {
        RawBinaryShaderArchive { blob }
    }

    /// Brings the archive and every native payload header and table into host
    /// byte order. Native code is left as stored.
    ///
    /// # Panics
    /// If the archive signature or version does not match this build.
    pub fn resolve_endian(self) -> Result<BinaryShaderArchive<'a>, SharcError> {
        let blob = self.blob;
        let (layout, file_size) = {
            let (mut walker, header, name_end) =
                endian::open_archive::<BinaryArchiveHeader>(&mut *blob)?;
            let limit = header.file_size as usize;

            let binaries = walker.array::<BinaryHeader, _>(
                "shader binary array",
                name_end,
                limit,
                |w, index, at, binary| {
                    let stage = ShaderStage::try_from(binary.stage)
                        .map_err(|stage| SharcError::UnknownStage { index, stage })?;
                    let end = at + binary.size as usize;
                    let name_end = w.name_region(
                        "shader binary name",
                        at + size_of::<BinaryHeader>(),
                        binary.name_len,
                        end,
                    )?;

                    let payload = at + binary.data_offset as usize;
                    if binary.data_offset % 4 != 0 {
                        return Err(SharcError::UnalignedLength {
                            what: "native payload offset",
                            offset: at,
                            len: binary.data_offset,
                        });
                    }
                    if payload < name_end {
                        return Err(SharcError::SizeMismatch {
                            what: "native payload offset",
                            offset: at,
                            declared: binary.data_offset,
                            actual: name_end - at,
                        });
                    }
                    let len = binary.data_size as usize;
                    if len < size_of::<NativeShaderHeader>() {
                        return Err(SharcError::Truncated {
                            what: "native payload",
                            offset: payload,
                            needed: size_of::<NativeShaderHeader>(),
                            available: len,
                        });
                    }
                    w.ensure_within("native payload", payload, len, end)?;
                    native::walk_payload(w, payload, len, stage)
                },
            )?;

            walker.array::<BinaryProgramHeader, _>(
                "binary program array",
                name_end + binaries,
                limit,
                |w, _, at, program| {
                    let end = at + program.size as usize;
                    let mut cursor = w.name_region(
                        "binary program name",
                        at + size_of::<BinaryProgramHeader>(),
                        program.name_len,
                        end,
                    )?;
                    cursor += walk_variations(w, cursor, end)?;
                    cursor += walk_variations(w, cursor, end)?;
                    walk_symbols(w, cursor, end)?;
                    Ok(())
                },
            )?;

            let source_endian = if walker.swaps() {
                Endian::NATIVE.swapped()
            } else {
                Endian::NATIVE
            };
            walker.finish();
            (
                Layout {
                    name_end,
                    source_endian,
                },
                limit,
            )
        };

        let archive = BinaryShaderArchive {
            blob: &mut blob[..file_size],
            layout,
        };
        tracing::debug!(
            target: "sharc",
            archive = archive.name(),
            source_endian = ?layout.source_endian,
            binaries = archive.binary_array().len(),
            pointer_resolved = archive.is_pointer_resolved(),
            "endian resolved"
        );
        Ok(archive)
    }
}

/// The phase a binary archive reached during [`BinaryShaderArchive::set_up`].
#[derive(Debug)]
pub enum BinarySetUp<'a> {
    EndianResolved(BinaryShaderArchive<'a>),
    Fixed(FixedBinaryShaderArchive<'a>),
}

impl<'a> BinarySetUp<'a> {
    /// Finishes set up, fixing up pointers if that has not happened yet.
    pub fn into_fixed(self) -> Result<FixedBinaryShaderArchive<'a>, SharcError> {
        match self {
            BinarySetUp::EndianResolved(archive) => archive.fix_up(),
            BinarySetUp::Fixed(archive) => Ok(archive),
        }
    }
}

/// A binary archive in host byte order whose payload offsets are not resolved.
pub struct BinaryShaderArchive<'a> {
    blob: &'a mut [u8],
    layout: Layout,
}

impl<'a> BinaryShaderArchive<'a> {
    pub const EXTENSION: &'static str = sharc_sys::BINARY_SHADER_ARCHIVE_EXTENSION;

    /// Resolves the byte order of `blob` and, if configured, its pointers.
    ///
    /// # Panics
    /// If the archive signature or version does not match this build.
    pub fn set_up(blob: &'a mut [u8], config: &SetUpConfig) -> Result<BinarySetUp<'a>, SharcError> {
        let archive = RawBinaryShaderArchive::new(blob).resolve_endian()?;
        if config.resolve_pointers {
            archive.fix_up().map(BinarySetUp::Fixed)
        } else {
            Ok(BinarySetUp::EndianResolved(archive))
        }
    }

    pub fn header(&self) -> ResView<'_, BinaryArchiveHeader> {
        self.layout.header(self.blob)
    }

    pub fn name(&self) -> &str {
        self.layout.name(self.blob)
    }

    pub fn source_endian(&self) -> Endian {
        self.layout.source_endian
    }

    pub fn binary_array(&self) -> ResArray<'_, ShaderBinary<'_>> {
        self.layout.binary_array(self.blob)
    }

    pub fn binary_program_array(&self) -> ResArray<'_, BinaryShaderProgram<'_>> {
        self.layout.binary_program_array(self.blob)
    }

    /// Whether the blob records a completed fixup from an earlier load.
    pub fn is_pointer_resolved(&self) -> bool {
        self.layout.is_pointer_resolved(self.blob)
    }

    /// Resolves every native payload offset and marks the blob as fixed up.
    ///
    /// Stored offsets are never rewritten; only the header's resolved word
    /// changes. Fixing up a blob that was fixed up by an earlier load yields
    /// the same relocations and leaves the blob unchanged.
    pub fn fix_up(self) -> Result<FixedBinaryShaderArchive<'a>, SharcError> {
        let BinaryShaderArchive { blob, layout } = self;

        let mut relocations = RelocationTable::default();
        let binary_offsets = {
            let binaries = layout.binary_array(blob).index();
            let mut binary_offsets = Vec::with_capacity(binaries.len());
            for (index, &offset) in binaries.offsets().iter().enumerate() {
                let at = layout.name_end + offset;
                binary_offsets.push(at);

                let Some(binary) = binaries.get(index) else {
                    break;
                };
                let stage = binary.stage().ok_or(SharcError::UnknownStage {
                    index,
                    stage: binary.view().data().stage,
                })?;
                native::relocate(
                    blob,
                    index,
                    stage,
                    at + binary.data_offset(),
                    binary.data_size(),
                    &mut relocations,
                )?;
            }
            binary_offsets
        };

        let resolved = offset_of!(BinaryArchiveHeader, resolved);
        blob[resolved..resolved + 4].copy_from_slice(&POINTERS_RESOLVED.to_ne_bytes());

        let archive = FixedBinaryShaderArchive {
            blob,
            layout,
            relocations,
            binary_offsets,
        };
        tracing::debug!(
            target: "sharc",
            archive = archive.name(),
            binaries = archive.binary_offsets.len(),
            relocations = archive.relocations.len(),
            "pointers fixed up"
        );
        Ok(archive)
    }
}

impl std::fmt::Debug for BinaryShaderArchive<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinaryShaderArchive")
            .field("name", &self.name())
            .field("size", &self.blob.len())
            .field("source_endian", &self.layout.source_endian)
            .field("pointer_resolved", &self.is_pointer_resolved())
            .finish()
    }
}

/// A binary archive with every native payload offset resolved.
#[derive(Debug)]
pub struct FixedBinaryShaderArchive<'a> {
    blob: &'a [u8],
    layout: Layout,
    relocations: RelocationTable,
    binary_offsets: Vec<usize>,
}

impl<'a> FixedBinaryShaderArchive<'a> {
    pub fn header(&self) -> ResView<'a, BinaryArchiveHeader> {
        self.layout.header(self.blob)
    }

    pub fn name(&self) -> &'a str {
        self.layout.name(self.blob)
    }

    pub fn source_endian(&self) -> Endian {
        self.layout.source_endian
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.blob
    }

    pub fn binary_array(&self) -> ResArray<'a, ShaderBinary<'a>> {
        self.layout.binary_array(self.blob)
    }

    pub fn binary_program_array(&self) -> ResArray<'a, BinaryShaderProgram<'a>> {
        self.layout.binary_program_array(self.blob)
    }

    pub fn program_by_name(&self, name: &str) -> Option<BinaryShaderProgram<'a>> {
        self.binary_program_array()
            .iter()
            .find(|program| program.name() == name)
    }

    pub fn is_pointer_resolved(&self) -> bool {
        true
    }

    pub fn relocations(&self) -> &RelocationTable {
        &self.relocations
    }

    /// The native shader of binary `index`.
    pub fn native_shader(&self, index: usize) -> Option<NativeShader<'_>> {
        let at = *self.binary_offsets.get(index)?;
        let rest = self.blob.get(at..)?;
        let size = ResView::<BinaryHeader>::new(rest).try_data()?.size as usize;
        let binary = ShaderBinary::from_view(ResView::new(rest.get(..size)?));
        NativeShader::new(
            self.blob,
            &self.relocations,
            index,
            binary.stage()?,
            binary.name(),
            at + binary.data_offset(),
        )
    }

    /// The binary `program` uses for `stage` in variation `id`.
    ///
    /// Variants of a stage are stored right after its original binary. A binary
    /// of another stage at that index yields `None`.
    pub fn program_binary(
        &self,
        program: &BinaryShaderProgram<'_>,
        stage: ShaderStage,
        id: VariationId,
    ) -> Option<NativeShader<'_>> {
        if !program.variation_space().contains(id) {
            return None;
        }
        let base = program.binary_index(stage)?;
        self.native_shader(base + id.0 as usize)
            .filter(|shader| shader.stage() == stage)
    }

    /// The binaries of every stage of `program` in variation `id`.
    pub fn program_binaries(
        &self,
        program: &BinaryShaderProgram<'_>,
        id: VariationId,
    ) -> [Option<NativeShader<'_>>; ShaderStage::COUNT] {
        ShaderStage::ALL.map(|stage| self.program_binary(program, stage, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relocation::{NativeTable, RelocField};
    use crate::test_utils::{
        build_archive, build_binary_archive, padded_len, AlignedBlob, BinaryProgramDesc,
        NativeShaderDesc, VariationDesc, RESOLVED_WORD,
    };

    const ARCHIVE: &str = "deferred";

    fn binaries() -> Vec<NativeShaderDesc> {
        let mut vertex = NativeShaderDesc::new("gbuffer.vs", ShaderStage::Vertex, &[0xde, 0xad, 0xbe, 0xef, 0x01]);
        vertex.uniform_blocks = vec!["cbView".into()];
        vertex.uniform_vars = vec!["uWorld".into(), "uViewProj".into()];
        vertex.attributes = vec!["aPosition".into(), "aNormal".into()];

        let mut vertex_skinned = NativeShaderDesc::new("gbuffer_skinned.vs", ShaderStage::Vertex, &[1, 2, 3, 4]);
        vertex_skinned.attributes = vec!["aPosition".into(), "aWeights".into()];

        let mut fragment = NativeShaderDesc::new("gbuffer.fs", ShaderStage::Fragment, &[9; 12]);
        fragment.mode = 3;
        fragment.samplers = vec!["sAlbedo".into(), "sNormal".into()];
        fragment.initial_values = vec![[1.0, 0.5, 0.25, 0.0]];
        fragment.loop_vars = vec![(16, 0x0004_0001)];
        // Not a vertex binary, so these are ignored.
        fragment.attributes = vec!["aIgnored".into()];

        let fragment_skinned = NativeShaderDesc::new("gbuffer_skinned.fs", ShaderStage::Fragment, &[7; 8]);

        let mut geometry = NativeShaderDesc::new("shadow.gs", ShaderStage::Geometry, &[5; 16]);
        geometry.copy_code = vec![6; 6];

        vec![vertex, vertex_skinned, fragment, fragment_skinned, geometry]
    }

    fn programs() -> Vec<BinaryProgramDesc> {
        let mut gbuffer = BinaryProgramDesc::new("gbuffer");
        gbuffer.binaries = [0, 2, -1];
        gbuffer.variations = vec![VariationDesc::new("SKINNED", "skin", &["0", "1"])];
        gbuffer.defaults = vec![VariationDesc::new("SKINNED", "skin", &["0"])];

        let mut shadow = BinaryProgramDesc::new("shadow");
        shadow.binaries = [-1, -1, 4];
        vec![gbuffer, shadow]
    }

    fn build(endian: Endian) -> AlignedBlob {
        build_binary_archive(ARCHIVE, &binaries(), &programs(), endian)
    }

    fn first_binary_offset() -> usize {
        size_of::<BinaryArchiveHeader>() + padded_len(ARCHIVE) as usize + 8
    }

    fn fixed(blob: &mut AlignedBlob) -> FixedBinaryShaderArchive<'_> {
        BinaryShaderArchive::set_up(blob.as_bytes_mut(), &SetUpConfig::default())
            .expect("set up")
            .into_fixed()
            .expect("fix up")
    }

    #[test]
    fn fixed_archive_reads_payloads() {
        let mut blob = build(Endian::NATIVE.swapped());
        let archive = fixed(&mut blob);

        assert_eq!(archive.name(), ARCHIVE);
        assert_eq!(archive.source_endian(), Endian::NATIVE.swapped());
        assert!(archive.is_pointer_resolved());
        assert_eq!(archive.binary_array().len(), 5);
        assert_eq!(BinaryShaderArchive::EXTENSION, "sharcfb");

        let vertex = archive.native_shader(0).expect("vertex binary");
        assert_eq!(vertex.stage(), ShaderStage::Vertex);
        assert_eq!(vertex.name(), "gbuffer.vs");
        assert_eq!(&*vertex.code().expect("code"), &[0xde, 0xad, 0xbe, 0xef, 0x01]);
        assert!(vertex.copy_code().is_none());
        let blocks: Vec<_> = vertex.uniform_blocks().map(|b| (b.name, b.location)).collect();
        assert_eq!(blocks, vec![("cbView", 0)]);
        let vars: Vec<_> = vertex.uniform_vars().map(|v| (v.name, v.offset, v.block_index)).collect();
        assert_eq!(vars, vec![("uWorld", 0, -1), ("uViewProj", 16, -1)]);
        let attribs: Vec<_> = vertex.attrib_vars().map(|a| (a.name, a.location)).collect();
        assert_eq!(attribs, vec![("aPosition", 0), ("aNormal", 1)]);

        let fragment = archive.native_shader(2).expect("fragment binary");
        assert_eq!(fragment.mode(), 3);
        assert_eq!(fragment.code().expect("code").len(), 12);
        let samplers: Vec<_> = fragment.sampler_vars().map(|s| s.name).collect();
        assert_eq!(samplers, vec!["sAlbedo", "sNormal"]);
        assert_eq!(fragment.initial_values()[0].value, [1.0, 0.5, 0.25, 0.0]);
        assert_eq!(fragment.loop_vars()[0].value, 0x0004_0001);
        assert_eq!(fragment.attrib_vars().count(), 0);
        assert!(archive
            .relocations()
            .get(2, RelocField::Table(NativeTable::AttribVars))
            .is_none());

        let geometry = archive.native_shader(4).expect("geometry binary");
        assert_eq!(&*geometry.copy_code().expect("copy code"), &[6; 6]);
        assert!(archive.native_shader(5).is_none());
    }

    #[test]
    fn relocations_point_into_payloads() {
        let mut blob = build(Endian::NATIVE);
        let archive = fixed(&mut blob);

        let code = archive.native_shader(0).unwrap().code().unwrap();
        let relocation = archive.relocations().get(0, RelocField::Code).expect("code relocation");
        assert_eq!(relocation.offset, 68);
        assert_eq!(code.blob_offset(), relocation.target());
        assert_eq!(&archive.bytes()[relocation.target()..relocation.target() + 5], &*code);

        let name = archive
            .relocations()
            .target(0, RelocField::Name(NativeTable::AttribVars, 1))
            .expect("name relocation");
        assert_eq!(&archive.bytes()[name..name + 8], b"aNormal\0");

        // Every relocation of binary 1 stays inside its own payload.
        for (binary, _, relocation) in archive.relocations().for_binaries(1..2) {
            assert_eq!(binary, 1);
            assert!(relocation.base > archive.relocations().get(0, RelocField::Code).unwrap().base);
        }
    }

    #[test]
    fn fix_up_marks_blob_and_reopening_is_stable() {
        let mut blob = build(Endian::NATIVE.swapped());
        let first = fixed(&mut blob).relocations().clone();
        assert_eq!(blob.word(RESOLVED_WORD), POINTERS_RESOLVED);
        let snapshot = blob.clone();

        let archive = RawBinaryShaderArchive::new(blob.as_bytes_mut())
            .resolve_endian()
            .expect("reopen");
        assert!(archive.is_pointer_resolved());
        let second = archive.fix_up().expect("fix up again").relocations().clone();

        assert_eq!(first, second);
        assert_eq!(blob, snapshot);
    }

    #[test]
    fn deferred_fix_up() {
        let mut blob = build(Endian::NATIVE);
        let config = SetUpConfig {
            resolve_pointers: false,
        };
        let set_up = BinaryShaderArchive::set_up(blob.as_bytes_mut(), &config).expect("set up");
        let BinarySetUp::EndianResolved(archive) = set_up else {
            panic!("pointers resolved despite config");
        };
        assert!(!archive.is_pointer_resolved());
        assert_eq!(archive.binary_program_array().len(), 2);

        let archive = archive.fix_up().expect("fix up");
        assert!(archive.native_shader(0).is_some());
        assert_eq!(blob.word(RESOLVED_WORD), POINTERS_RESOLVED);
    }

    #[test]
    fn program_binaries_follow_variation_ids() {
        let mut blob = build(Endian::NATIVE);
        let archive = fixed(&mut blob);
        let gbuffer = archive.program_by_name("gbuffer").expect("program");
        let space = gbuffer.variation_space();
        assert_eq!(space.variant_count(), 1);
        assert_eq!(gbuffer.default_variation(&space), VariationId::ORIGINAL);

        let [vs, fs, gs] = archive.program_binaries(&gbuffer, VariationId::ORIGINAL);
        assert_eq!(vs.map(|s| s.name()), Some("gbuffer.vs"));
        assert_eq!(fs.map(|s| s.name()), Some("gbuffer.fs"));
        assert!(gs.is_none());

        let skinned = space.to_index(&[("SKINNED", "1")]);
        let [vs, fs, _] = archive.program_binaries(&gbuffer, skinned);
        assert_eq!(vs.map(|s| s.name()), Some("gbuffer_skinned.vs"));
        assert_eq!(fs.map(|s| s.name()), Some("gbuffer_skinned.fs"));

        assert!(archive
            .program_binary(&gbuffer, ShaderStage::Vertex, VariationId(2))
            .is_none());

        let shadow = archive.program_by_name("shadow").expect("program");
        let geometry = archive
            .program_binary(&shadow, ShaderStage::Geometry, VariationId::ORIGINAL)
            .expect("geometry");
        assert_eq!(geometry.binary_index(), 4);
    }

    #[test]
    fn program_binary_checks_stage() {
        let mut programs = programs();
        let mut mismatched = BinaryProgramDesc::new("mismatched");
        mismatched.binaries = [2, -1, -1];
        programs.push(mismatched);
        let mut blob = build_binary_archive(ARCHIVE, &binaries(), &programs, Endian::NATIVE);
        let archive = fixed(&mut blob);

        let mismatched = archive.program_by_name("mismatched").expect("program");
        assert!(archive
            .program_binary(&mismatched, ShaderStage::Vertex, VariationId::ORIGINAL)
            .is_none());
        assert_eq!(archive.native_shader(2).map(|s| s.stage()), Some(ShaderStage::Fragment));
    }

    #[test]
    fn unknown_stage() {
        let mut blob = build(Endian::NATIVE);
        blob.set_word(first_binary_offset() + 4, 7);
        let err = RawBinaryShaderArchive::new(blob.as_bytes_mut())
            .resolve_endian()
            .unwrap_err();
        assert!(matches!(err, SharcError::UnknownStage { index: 0, stage: 7 }));
    }

    #[test]
    fn code_offset_escaping_payload() {
        let mut blob = build(Endian::NATIVE);
        let at = first_binary_offset();
        let payload = at + blob.word(at + 12) as usize;
        blob.set_word(payload + 8, 0x1000);

        let err = BinaryShaderArchive::set_up(blob.as_bytes_mut(), &SetUpConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            SharcError::RelocationOutOfBounds {
                binary: 0,
                field: RelocField::Code,
                offset: 0x1000,
            }
        ));
    }

    fn first_payload(blob: &AlignedBlob) -> (usize, usize) {
        let at = first_binary_offset();
        (at + blob.word(at + 12) as usize, blob.word(at + 16) as usize)
    }

    #[test]
    fn table_escaping_payload() {
        let mut blob = build(Endian::NATIVE);
        let (payload, _) = first_payload(&blob);
        // 100 attribute entries of 16 bytes.
        blob.set_word(payload + 60, 100);

        let err = RawBinaryShaderArchive::new(blob.as_bytes_mut())
            .resolve_endian()
            .unwrap_err();
        assert!(matches!(err, SharcError::Truncated { what: "native table", .. }));
    }

    #[test]
    fn table_inside_payload_header() {
        // Same layout as the native build.
        let (payload, _) = first_payload(&build(Endian::NATIVE));
        let mut blob = build(Endian::NATIVE.swapped());
        blob.set_word(payload + 24, 40u32.swap_bytes());

        let err = RawBinaryShaderArchive::new(blob.as_bytes_mut())
            .resolve_endian()
            .unwrap_err();
        assert!(matches!(
            err,
            SharcError::OverlappingTable {
                table: NativeTable::UniformBlocks,
                offset: 40,
                ..
            }
        ));
    }

    #[test]
    fn overlapping_tables() {
        let mut blob = build(Endian::NATIVE);
        let (payload, _) = first_payload(&blob);
        let blocks = blob.word(payload + 24);
        // Uniform vars start on the uniform block table.
        blob.set_word(payload + 32, blocks);

        let err = RawBinaryShaderArchive::new(blob.as_bytes_mut())
            .resolve_endian()
            .unwrap_err();
        assert!(matches!(
            err,
            SharcError::OverlappingTable {
                table: NativeTable::UniformVars,
                ..
            }
        ));
    }

    #[test]
    fn unterminated_name() {
        let mut blob = build(Endian::NATIVE);
        let (payload, len) = first_payload(&blob);
        let attribs = blob.word(payload + 64) as usize;
        let last = (len - 4) as u32;
        blob.set_word(payload + last as usize, u32::from_ne_bytes(*b"AAAA"));
        blob.set_word(payload + attribs, last);

        let err = BinaryShaderArchive::set_up(blob.as_bytes_mut(), &SetUpConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            SharcError::RelocationOutOfBounds {
                binary: 0,
                field: RelocField::Name(NativeTable::AttribVars, 0),
                offset,
            } if offset == last
        ));
    }

    #[test]
    fn truncated_payload() {
        let mut blob = build(Endian::NATIVE);
        let at = first_binary_offset();
        blob.set_word(at + 16, 32);
        let err = RawBinaryShaderArchive::new(blob.as_bytes_mut())
            .resolve_endian()
            .unwrap_err();
        assert!(matches!(err, SharcError::Truncated { what: "native payload", .. }));
    }

    #[test]
    #[should_panic(expected = "Wrong binary. [SHAA], expected [SHBA].")]
    fn portable_archive_is_not_binary() {
        let mut blob = build_archive("portable", &[], &[], Endian::NATIVE);
        let _ = RawBinaryShaderArchive::new(blob.as_bytes_mut()).resolve_endian();
    }
}
