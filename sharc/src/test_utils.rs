//! Builders for synthetic shader archives.
//!
//! Archives can be written in either byte order. Everything the loader swaps is
//! written in the requested order; strings, shader text, native code and
//! uniform-block default values are written as plain bytes, so resolving a
//! foreign archive yields exactly the bytes of the same archive built natively.

use crate::enums::{ShaderStage, StageFlags, SymbolCategory};
use crate::Endian;
use sharc_sys::{
    BINARY_SHADER_ARCHIVE_SIGNATURE, BINARY_SHADER_ARCHIVE_VERSION, BYTE_ORDER_MARK, NO_INDEX,
    SHADER_ARCHIVE_SIGNATURE, SHADER_ARCHIVE_VERSION,
};

/// Owned archive bytes backed by `u32` storage so the base is 4-byte aligned.
#[derive(Clone, PartialEq, Eq)]
pub struct AlignedBlob {
    words: Vec<u32>,
    len: usize,
}

impl AlignedBlob {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut words = vec![0u32; bytes.len().div_ceil(4)];
        bytemuck::cast_slice_mut::<u32, u8>(&mut words)[..bytes.len()].copy_from_slice(bytes);
        AlignedBlob {
            words,
            len: bytes.len(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &bytemuck::cast_slice(&self.words)[..self.len]
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut bytemuck::cast_slice_mut(&mut self.words)[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Overwrites the word at byte offset `at` in host order.
    pub fn set_word(&mut self, at: usize, value: u32) {
        self.as_bytes_mut()[at..at + 4].copy_from_slice(&value.to_ne_bytes());
    }

    pub fn word(&self, at: usize) -> u32 {
        u32::from_ne_bytes(self.as_bytes()[at..at + 4].try_into().expect("whole word"))
    }
}

impl std::fmt::Debug for AlignedBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlignedBlob").field("len", &self.len).finish()
    }
}

/// Padded byte length of a NUL-terminated string region.
pub fn padded_len(s: &str) -> u32 {
    ((s.len() + 1).next_multiple_of(4)) as u32
}

struct Writer {
    bytes: Vec<u8>,
    endian: Endian,
}

impl Writer {
    fn new(endian: Endian) -> Self {
        Writer {
            bytes: Vec::new(),
            endian,
        }
    }

    fn pos(&self) -> usize {
        self.bytes.len()
    }

    fn u32(&mut self, value: u32) {
        self.bytes.extend_from_slice(&self.endian.write_u32(value));
    }

    fn i32(&mut self, value: i32) {
        self.u32(value as u32);
    }

    fn f32(&mut self, value: f32) {
        self.u32(value.to_bits());
    }

    fn raw(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    fn pad(&mut self) {
        let padded = self.bytes.len().next_multiple_of(4);
        self.bytes.resize(padded, 0);
    }

    /// A NUL-terminated string padded to [`padded_len`].
    fn str(&mut self, s: &str) {
        self.raw(s.as_bytes());
        self.raw(&[0]);
        self.pad();
    }

    fn patch(&mut self, at: usize, value: u32) {
        let word = self.endian.write_u32(value);
        self.bytes[at..at + 4].copy_from_slice(&word);
    }

    /// An element whose first word is its own size.
    fn element(&mut self, body: impl FnOnce(&mut Writer)) {
        let start = self.pos();
        self.u32(0);
        body(self);
        let size = (self.pos() - start) as u32;
        self.patch(start, size);
    }

    fn array<T>(&mut self, items: &[T], mut each: impl FnMut(&mut Writer, &T)) {
        let start = self.pos();
        self.u32(0);
        self.u32(items.len() as u32);
        for item in items {
            each(self, item);
        }
        let size = (self.pos() - start) as u32;
        self.patch(start, size);
    }

    fn finish(self) -> AlignedBlob {
        AlignedBlob::from_bytes(&self.bytes)
    }
}

#[derive(Debug, Clone, Default)]
pub struct VariationDesc {
    pub name: String,
    pub id: String,
    pub values: Vec<String>,
}

impl VariationDesc {
    pub fn new(name: &str, id: &str, values: &[&str]) -> Self {
        VariationDesc {
            name: name.into(),
            id: id.into(),
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SymbolDesc {
    pub name: String,
    pub id: String,
    pub default_value: Vec<u32>,
    pub stages: StageFlags,
}

impl SymbolDesc {
    pub fn new(name: &str, id: &str, default_value: Vec<u32>, stages: StageFlags) -> Self {
        SymbolDesc {
            name: name.into(),
            id: id.into(),
            default_value,
            stages,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProgramDesc {
    pub name: String,
    pub sources: [i32; ShaderStage::COUNT],
    pub macros: [Vec<(String, String)>; ShaderStage::COUNT],
    pub variations: Vec<VariationDesc>,
    pub defaults: Vec<VariationDesc>,
    pub symbols: [Vec<SymbolDesc>; SymbolCategory::COUNT],
}

impl ProgramDesc {
    pub fn new(name: &str) -> Self {
        ProgramDesc {
            name: name.into(),
            sources: [NO_INDEX; ShaderStage::COUNT],
            macros: Default::default(),
            variations: Vec::new(),
            defaults: Vec::new(),
            symbols: Default::default(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SourceDesc {
    pub name: String,
    pub text: String,
}

impl SourceDesc {
    pub fn new(name: &str, text: &str) -> Self {
        SourceDesc {
            name: name.into(),
            text: text.into(),
        }
    }
}

/// One native shader binary. Entries other than names get index-derived fields.
#[derive(Debug, Clone)]
pub struct NativeShaderDesc {
    pub name: String,
    pub stage: ShaderStage,
    pub mode: u32,
    pub code: Vec<u8>,
    pub copy_code: Vec<u8>,
    pub uniform_blocks: Vec<String>,
    pub uniform_vars: Vec<String>,
    pub initial_values: Vec<[f32; 4]>,
    pub loop_vars: Vec<(u32, u32)>,
    pub samplers: Vec<String>,
    pub attributes: Vec<String>,
}

impl NativeShaderDesc {
    pub fn new(name: &str, stage: ShaderStage, code: &[u8]) -> Self {
        NativeShaderDesc {
            name: name.into(),
            stage,
            mode: 0,
            code: code.to_vec(),
            copy_code: Vec::new(),
            uniform_blocks: Vec::new(),
            uniform_vars: Vec::new(),
            initial_values: Vec::new(),
            loop_vars: Vec::new(),
            samplers: Vec::new(),
            attributes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BinaryProgramDesc {
    pub name: String,
    pub binaries: [i32; ShaderStage::COUNT],
    pub variations: Vec<VariationDesc>,
    pub defaults: Vec<VariationDesc>,
    pub symbols: [Vec<SymbolDesc>; SymbolCategory::COUNT],
}

impl BinaryProgramDesc {
    pub fn new(name: &str) -> Self {
        BinaryProgramDesc {
            name: name.into(),
            binaries: [NO_INDEX; ShaderStage::COUNT],
            variations: Vec::new(),
            defaults: Vec::new(),
            symbols: Default::default(),
        }
    }
}

fn write_variations(w: &mut Writer, variations: &[VariationDesc]) {
    w.array(variations, |w, variation| {
        let joined_len: usize = variation.values.iter().map(|v| v.len() + 1).sum();
        let values_len = joined_len.next_multiple_of(4) as u32;
        w.element(|w| {
            w.u32(padded_len(&variation.name));
            w.u32(variation.values.len() as u32);
            w.u32(values_len);
            w.u32(padded_len(&variation.id));
            w.str(&variation.name);
            for value in &variation.values {
                w.raw(value.as_bytes());
                w.raw(&[0]);
            }
            w.pad();
            w.str(&variation.id);
        });
    });
}

fn write_symbols(w: &mut Writer, symbols: &[Vec<SymbolDesc>; SymbolCategory::COUNT]) {
    for category in SymbolCategory::ALL {
        w.array(&symbols[category as usize], |w, symbol| {
            w.element(|w| {
                w.u32(padded_len(&symbol.name));
                w.u32(padded_len(&symbol.id));
                w.u32(symbol.default_value.len() as u32 * 4);
                w.u32(symbol.stages.bits());
                w.str(&symbol.name);
                w.str(&symbol.id);
                for &word in &symbol.default_value {
                    if category.has_default_value() {
                        w.u32(word);
                    } else {
                        w.raw(&word.to_ne_bytes());
                    }
                }
            });
        });
    }
}

/// Builds a portable archive in `endian` byte order.
pub fn build_archive(
    name: &str,
    programs: &[ProgramDesc],
    sources: &[SourceDesc],
    endian: Endian,
) -> AlignedBlob {
    let mut w = Writer::new(endian);
    w.u32(SHADER_ARCHIVE_SIGNATURE);
    w.u32(SHADER_ARCHIVE_VERSION);
    w.u32(0);
    w.u32(BYTE_ORDER_MARK);
    w.u32(padded_len(name));
    w.str(name);

    w.array(programs, |w, program| {
        w.element(|w| {
            w.u32(padded_len(&program.name));
            for source in program.sources {
                w.i32(source);
            }
            w.str(&program.name);
            for macros in &program.macros {
                w.array(macros, |w, (name, value)| {
                    w.element(|w| {
                        w.u32(padded_len(name));
                        w.u32(padded_len(value));
                        w.str(name);
                        w.str(value);
                    });
                });
            }
            write_variations(w, &program.variations);
            write_variations(w, &program.defaults);
            write_symbols(w, &program.symbols);
        });
    });

    w.array(sources, |w, source| {
        w.element(|w| {
            w.u32(padded_len(&source.name));
            w.u32(padded_len(&source.text));
            w.str(&source.name);
            w.str(&source.text);
        });
    });

    let size = w.pos() as u32;
    w.patch(8, size);
    w.finish()
}

/// Offset of the `resolved` word in a binary archive header.
pub const RESOLVED_WORD: usize = 16;

fn write_native(w: &mut Writer, shader: &NativeShaderDesc) {
    const HEADER: u32 = 68;
    let start = w.pos();

    let named_tables = [
        (&shader.uniform_blocks, 12u32),
        (&shader.uniform_vars, 20),
        (&shader.samplers, 12),
        (&shader.attributes, 16),
    ];

    // Code blocks, then tables, then the string pool.
    let mut cursor = HEADER;
    let mut place = |len: u32| {
        if len == 0 {
            return 0;
        }
        let at = cursor;
        cursor += len.next_multiple_of(4);
        at
    };
    let code_offset = place(shader.code.len() as u32);
    let copy_code_offset = place(shader.copy_code.len() as u32);
    let blocks_offset = place(named_tables[0].0.len() as u32 * named_tables[0].1);
    let vars_offset = place(named_tables[1].0.len() as u32 * named_tables[1].1);
    let initial_offset = place(shader.initial_values.len() as u32 * 20);
    let loops_offset = place(shader.loop_vars.len() as u32 * 8);
    let samplers_offset = place(named_tables[2].0.len() as u32 * named_tables[2].1);
    let attribs_offset = place(named_tables[3].0.len() as u32 * named_tables[3].1);

    let mut name_offsets: Vec<Vec<u32>> = Vec::new();
    for (names, _) in named_tables {
        name_offsets.push(
            names
                .iter()
                .map(|name| {
                    let at = cursor;
                    cursor += name.len() as u32 + 1;
                    at
                })
                .collect(),
        );
    }

    w.u32(shader.mode);
    w.u32(shader.code.len() as u32);
    w.u32(code_offset);
    w.u32(shader.copy_code.len() as u32);
    w.u32(copy_code_offset);
    w.u32(shader.uniform_blocks.len() as u32);
    w.u32(blocks_offset);
    w.u32(shader.uniform_vars.len() as u32);
    w.u32(vars_offset);
    w.u32(shader.initial_values.len() as u32);
    w.u32(initial_offset);
    w.u32(shader.loop_vars.len() as u32);
    w.u32(loops_offset);
    w.u32(shader.samplers.len() as u32);
    w.u32(samplers_offset);
    w.u32(shader.attributes.len() as u32);
    w.u32(attribs_offset);

    w.raw(&shader.code);
    w.pad();
    w.raw(&shader.copy_code);
    w.pad();
    for (index, name) in name_offsets[0].iter().enumerate() {
        w.u32(*name);
        w.u32(index as u32);
        w.u32(16);
    }
    for (index, name) in name_offsets[1].iter().enumerate() {
        w.u32(*name);
        w.u32(0);
        w.u32(1);
        w.u32(index as u32 * 16);
        w.i32(NO_INDEX);
    }
    for (index, value) in shader.initial_values.iter().enumerate() {
        for component in value {
            w.f32(*component);
        }
        w.u32(index as u32 * 16);
    }
    for (offset, value) in &shader.loop_vars {
        w.u32(*offset);
        w.u32(*value);
    }
    for (index, name) in name_offsets[2].iter().enumerate() {
        w.u32(*name);
        w.u32(0);
        w.u32(index as u32);
    }
    for (index, name) in name_offsets[3].iter().enumerate() {
        w.u32(*name);
        w.u32(0);
        w.u32(1);
        w.u32(index as u32);
    }
    for (names, _) in named_tables {
        for name in names {
            w.raw(name.as_bytes());
            w.raw(&[0]);
        }
    }
    w.pad();
    debug_assert_eq!(w.pos() - start, cursor.next_multiple_of(4) as usize);
}

/// Builds a binary archive in `endian` byte order with unresolved pointers.
pub fn build_binary_archive(
    name: &str,
    binaries: &[NativeShaderDesc],
    programs: &[BinaryProgramDesc],
    endian: Endian,
) -> AlignedBlob {
    let mut w = Writer::new(endian);
    w.u32(BINARY_SHADER_ARCHIVE_SIGNATURE);
    w.u32(BINARY_SHADER_ARCHIVE_VERSION);
    w.u32(0);
    w.u32(BYTE_ORDER_MARK);
    w.u32(0);
    w.u32(padded_len(name));
    w.str(name);

    w.array(binaries, |w, binary| {
        w.element(|w| {
            let start = w.pos() - 4;
            w.u32(binary.stage as u32);
            w.u32(padded_len(&binary.name));
            let data_offset_at = w.pos();
            w.u32(0);
            let data_size_at = w.pos();
            w.u32(0);
            w.str(&binary.name);

            let payload = w.pos();
            write_native(w, binary);
            let data_size = (w.pos() - payload) as u32;
            w.patch(data_offset_at, (payload - start) as u32);
            w.patch(data_size_at, data_size);
        });
    });

    w.array(programs, |w, program| {
        w.element(|w| {
            w.u32(padded_len(&program.name));
            for binary in program.binaries {
                w.i32(binary);
            }
            w.str(&program.name);
            write_variations(w, &program.variations);
            write_variations(w, &program.defaults);
            write_symbols(w, &program.symbols);
        });
    });

    let size = w.pos() as u32;
    w.patch(8, size);
    w.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aligned_blob_is_word_aligned() {
        let blob = AlignedBlob::from_bytes(&[1, 2, 3, 4, 5, 6]);
        assert_eq!(blob.as_bytes().as_ptr() as usize % 4, 0);
        assert_eq!(blob.as_bytes(), &[1, 2, 3, 4, 5, 6]);
        assert_eq!(blob.len(), 6);
    }

    #[test]
    fn padded_len_counts_terminator() {
        assert_eq!(padded_len(""), 4);
        assert_eq!(padded_len("abc"), 4);
        assert_eq!(padded_len("abcd"), 8);
    }

    #[test]
    fn archive_header_words() {
        let blob = build_archive("a", &[], &[], Endian::NATIVE);
        assert_eq!(blob.word(0), SHADER_ARCHIVE_SIGNATURE);
        assert_eq!(blob.word(8) as usize, blob.len());
        assert_eq!(blob.word(12), BYTE_ORDER_MARK);

        let foreign = build_archive("a", &[], &[], Endian::NATIVE.swapped());
        assert_eq!(foreign.word(12), BYTE_ORDER_MARK.swap_bytes());
        assert_eq!(foreign.len(), blob.len());
    }
}
