use crate::relocation::Relocation;
use std::ops::Deref;

/// Native GPU code of one shader binary, borrowed from a fixed-up archive.
#[derive(Copy, Clone)]
pub struct ShaderCode<'a> {
    bytes: &'a [u8],
    relocation: Relocation,
}

impl<'a> ShaderCode<'a> {
    pub(crate) fn new(bytes: &'a [u8], relocation: Relocation) -> Self {
        Self { bytes, relocation }
    }

    /// Absolute offset of the code in the archive blob.
    pub fn blob_offset(&self) -> usize {
        self.relocation.target()
    }

    pub fn relocation(&self) -> Relocation {
        self.relocation
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }
}

impl Deref for ShaderCode<'_> {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.bytes
    }
}

impl std::fmt::Debug for ShaderCode<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShaderCode")
            .field("blob_offset", &self.blob_offset())
            .field("len", &self.bytes.len())
            .finish()
    }
}
