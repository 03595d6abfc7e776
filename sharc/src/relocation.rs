use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;

/// A table inside a native shader payload.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum NativeTable {
    UniformBlocks,
    UniformVars,
    InitialValues,
    LoopVars,
    SamplerVars,
    AttribVars,
}

impl fmt::Display for NativeTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NativeTable::UniformBlocks => "uniform blocks",
            NativeTable::UniformVars => "uniform vars",
            NativeTable::InitialValues => "initial values",
            NativeTable::LoopVars => "loop vars",
            NativeTable::SamplerVars => "sampler vars",
            NativeTable::AttribVars => "attrib vars",
        })
    }
}

/// A stored offset inside one shader binary.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum RelocField {
    Code,
    /// Geometry stage only.
    CopyCode,
    Table(NativeTable),
    /// The name of entry `n` of a table.
    Name(NativeTable, u32),
}

/// A stored payload-relative offset and the payload it is relative to.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub struct Relocation {
    /// Absolute blob offset of the payload start.
    pub base: usize,
    /// The offset as stored in the archive.
    pub offset: u32,
}

impl Relocation {
    /// Absolute blob offset the stored offset resolves to.
    pub fn target(&self) -> usize {
        self.base + self.offset as usize
    }
}

/// Resolved offsets of every shader binary in an archive.
///
/// The archive keeps its stored offsets; this table is the only place their
/// absolute targets are recorded. Absent tables and code blocks have no entry.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RelocationTable {
    entries: BTreeMap<(usize, RelocField), Relocation>,
}

impl RelocationTable {
    pub(crate) fn insert(&mut self, binary: usize, field: RelocField, relocation: Relocation) {
        tracing::trace!(
            target: "sharc",
            binary,
            ?field,
            offset = relocation.offset,
            resolved = relocation.target(),
            "relocation"
        );
        self.entries.insert((binary, field), relocation);
    }

    pub fn get(&self, binary: usize, field: RelocField) -> Option<&Relocation> {
        self.entries.get(&(binary, field))
    }

    pub fn target(&self, binary: usize, field: RelocField) -> Option<usize> {
        self.get(binary, field).map(Relocation::target)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, RelocField, &Relocation)> {
        self.entries
            .iter()
            .map(|((binary, field), relocation)| (*binary, *field, relocation))
    }

    /// Every relocation of the binaries in `binaries`.
    pub fn for_binaries(
        &self,
        binaries: Range<usize>,
    ) -> impl Iterator<Item = (usize, RelocField, &Relocation)> {
        let start = (binaries.start, RelocField::Code);
        self.entries
            .range(start..)
            .take_while(move |((binary, _), _)| *binary < binaries.end)
            .map(|((binary, field), relocation)| (*binary, *field, relocation))
    }
}
