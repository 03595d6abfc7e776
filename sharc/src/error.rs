use crate::relocation::{NativeTable, RelocField};
use crate::signature::Signature;
use thiserror::Error;

#[derive(Debug, Error)]
/// Error type for loading shader archives.
pub enum SharcError {
    /// The blob does not start on a 4-byte boundary.
    #[error("Archive blob at {0:#x} is not 4-byte aligned.")]
    Misaligned(usize),
    /// A region extends past the end of its parent.
    #[error("The {what} at offset {offset} needs {needed} bytes but only {available} remain.")]
    Truncated {
        what: &'static str,
        offset: usize,
        needed: usize,
        available: usize,
    },
    /// A size or length field is not a whole number of words.
    #[error("The {what} at offset {offset} has unaligned length {len}.")]
    UnalignedLength {
        what: &'static str,
        offset: usize,
        len: u32,
    },
    /// The byte-order mark is neither native nor swapped.
    #[error("Unrecognized byte-order mark {0:#010x}.")]
    InvalidByteOrderMark(u32),
    /// The elements of an array do not add up to its declared size.
    #[error("The {what} at offset {offset} declares {declared} bytes but its elements span {actual}.")]
    SizeMismatch {
        what: &'static str,
        offset: usize,
        declared: u32,
        actual: usize,
    },
    /// A native shader binary names a stage outside vertex, fragment and geometry.
    #[error("Shader binary {index} has unknown stage {stage}.")]
    UnknownStage { index: usize, stage: u32 },
    /// A native table shares words with its payload header or another table.
    #[error("The native {table} table at offset {offset} of the payload at {payload} overlaps the header or another table.")]
    OverlappingTable {
        payload: usize,
        table: NativeTable,
        offset: u32,
    },
    /// A stored offset points outside the native payload it belongs to.
    #[error("Relocation {field:?} of shader binary {binary} with offset {offset} escapes its payload.")]
    RelocationOutOfBounds {
        binary: usize,
        field: RelocField,
        offset: u32,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
/// A signature or version disagreement between the archive and this build.
pub enum VerifyError {
    #[error("Wrong binary. [{actual}], expected [{expected}].")]
    Signature {
        expected: Signature,
        actual: Signature,
    },
    #[error("Version error. current:{expected} binary:{actual}")]
    Version { expected: u32, actual: u32 },
}
