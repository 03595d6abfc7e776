//! Portable shader archives (`.sharc`).

use crate::endian::{self, Endian, Walker};
use crate::enums::{ShaderStage, SymbolCategory};
use crate::error::SharcError;
use crate::program::{ShaderProgram, ShaderSource};
use crate::res::{nth_array, read_str, ResArray, ResView};
use sharc_sys::{
    ArchiveHeader, MacroHeader, ProgramHeader, SourceHeader, SymbolHeader, VariationHeader,
};
use std::mem::size_of;

/// Validates consecutive padded regions starting at `at`, returning the offset past the last.
pub(crate) fn regions(
    walker: &Walker<'_>,
    what: &'static str,
    mut at: usize,
    lens: &[u32],
    end: usize,
) -> Result<usize, SharcError> {
    for &len in lens {
        at = walker.name_region(what, at, len, end)?;
    }
    Ok(at)
}

/// Walks a variation or variation-default array, returning its size.
pub(crate) fn walk_variations(
    walker: &mut Walker<'_>,
    offset: usize,
    limit: usize,
) -> Result<usize, SharcError> {
    walker.array::<VariationHeader, _>("variation array", offset, limit, |w, _, at, variation| {
        regions(
            w,
            "variation",
            at + size_of::<VariationHeader>(),
            &[variation.name_len, variation.values_len, variation.id_len],
            at + variation.size as usize,
        )?;
        Ok(())
    })
}

/// Walks the four symbol arrays, returning their combined size.
///
/// Default values are swapped as words, except for uniform blocks whose
/// default value is an opaque byte image.
pub(crate) fn walk_symbols(
    walker: &mut Walker<'_>,
    offset: usize,
    limit: usize,
) -> Result<usize, SharcError> {
    let mut cursor = offset;
    for category in SymbolCategory::ALL {
        cursor += walker.array::<SymbolHeader, _>("symbol array", cursor, limit, |w, _, at, symbol| {
            let end = at + symbol.size as usize;
            let value_at = regions(
                w,
                "symbol",
                at + size_of::<SymbolHeader>(),
                &[symbol.name_len, symbol.id_len],
                end,
            )?;
            let value_len = symbol.default_value_size as usize;
            if category.has_default_value() {
                w.words("symbol default value", value_at, value_len, end)
            } else {
                w.ensure_within("symbol default value", value_at, value_len, end)
            }
        })?;
    }
    Ok(cursor - offset)
}

fn walk_program(walker: &mut Walker<'_>, at: usize, program: &ProgramHeader) -> Result<(), SharcError> {
    let end = at + program.size as usize;
    let mut cursor = walker.name_region(
        "program name",
        at + size_of::<ProgramHeader>(),
        program.name_len,
        end,
    )?;

    for _ in ShaderStage::ALL {
        cursor += walker.array::<MacroHeader, _>("macro array", cursor, end, |w, _, at, macro_| {
            regions(
                w,
                "macro",
                at + size_of::<MacroHeader>(),
                &[macro_.name_len, macro_.value_len],
                at + macro_.size as usize,
            )?;
            Ok(())
        })?;
    }

    // Variations, then variation defaults.
    cursor += walk_variations(walker, cursor, end)?;
    cursor += walk_variations(walker, cursor, end)?;
    walk_symbols(walker, cursor, end)?;
    Ok(())
}

/// A portable archive whose byte order has not been resolved yet.
pub struct RawShaderArchive<'a> {
    blob: &'a mut [u8],
}

impl<'a> RawShaderArchive<'a> {
    pub fn new(blob: &'a mut [u8]) -> Self {
        RawShaderArchive { blob }
    }

    /// Brings the archive into host byte order and validates its layout.
    ///
    /// Resolving an archive that is already in host order only validates it
    /// and leaves every byte untouched. On error the blob may be left partly
    /// swapped.
    ///
    /// # Panics
    /// If the archive signature or version does not match this build.
    pub fn resolve_endian(self) -> Result<ShaderArchive<'a>, SharcError> {
        let blob = self.blob;
        let (source_endian, file_size, name_end) = {
            let (mut walker, header, name_end) = endian::open_archive::<ArchiveHeader>(&mut *blob)?;
            let limit = header.file_size as usize;
            let programs = walker.array::<ProgramHeader, _>("program array", name_end, limit, |w, _, at, program| {
                walk_program(w, at, program)
            })?;
            walker.array::<SourceHeader, _>("source array", name_end + programs, limit, |w, _, at, source| {
                regions(
                    w,
                    "source",
                    at + size_of::<SourceHeader>(),
                    &[source.name_len, source.text_len],
                    at + source.size as usize,
                )?;
                Ok(())
            })?;

            let source_endian = if walker.swaps() {
                Endian::NATIVE.swapped()
            } else {
                Endian::NATIVE
            };
            walker.finish();
            (source_endian, limit, name_end)
        };

        let blob: &'a [u8] = blob;
        let archive = ShaderArchive {
            blob: &blob[..file_size],
            name_end,
            source_endian,
        };
        tracing::debug!(
            target: "sharc",
            archive = archive.name(),
            ?source_endian,
            programs = archive.program_array().len(),
            "endian resolved"
        );
        Ok(archive)
    }
}

/// A portable archive in host byte order.
#[derive(Copy, Clone)]
pub struct ShaderArchive<'a> {
    blob: &'a [u8],
    name_end: usize,
    source_endian: Endian,
}

impl<'a> ShaderArchive<'a> {
    pub const EXTENSION: &'static str = sharc_sys::SHADER_ARCHIVE_EXTENSION;

    /// Resolves the byte order of `blob` and views it as an archive.
    ///
    /// # Panics
    /// If the archive signature or version does not match this build.
    pub fn set_up(blob: &'a mut [u8]) -> Result<Self, SharcError> {
        RawShaderArchive::new(blob).resolve_endian()
    }

    pub fn header(&self) -> ResView<'a, ArchiveHeader> {
        ResView::new(self.blob)
    }

    pub fn name(&self) -> &'a str {
        read_str(&self.blob[size_of::<ArchiveHeader>()..self.name_end])
    }

    /// The byte order the archive was stored in before it was resolved.
    pub fn source_endian(&self) -> Endian {
        self.source_endian
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.blob
    }

    pub fn program_array(&self) -> ResArray<'a, ShaderProgram<'a>> {
        nth_array(self.blob, self.name_end, 0)
    }

    pub fn source_array(&self) -> ResArray<'a, ShaderSource<'a>> {
        nth_array(self.blob, self.name_end, 1)
    }

    pub fn program_by_name(&self, name: &str) -> Option<ShaderProgram<'a>> {
        self.program_array().iter().find(|program| program.name() == name)
    }

    /// The source a program uses for `stage`, if any.
    pub fn program_source(&self, program: &ShaderProgram<'_>, stage: ShaderStage) -> Option<ShaderSource<'a>> {
        let index = program.source_index(stage)?;
        self.source_array().iter().nth(index)
    }
}

impl std::fmt::Debug for ShaderArchive<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShaderArchive")
            .field("name", &self.name())
            .field("size", &self.blob.len())
            .field("source_endian", &self.source_endian)
            .finish()
    }
}
