//! Byte-order resolution.
//!
//! An archive is resolved by a single forward walk. Each fixed prefix is swapped
//! before any size or count inside it is read, so the walk only ever trusts
//! fields that are already in host order. When the archive is already in host
//! order the same walk runs read-only and only validates bounds.
//!
//! The archive header carries the byte-order mark, so it is swapped last, once
//! the rest of the walk has succeeded.

use crate::error::SharcError;
use crate::signature::{self, Signed};
use bytemuck::Pod;
use sharc_sys::{
    ArchiveHeader, ArrayHeader, BinaryArchiveHeader, SizedElement, BYTE_ORDER_MARK,
};
use std::mem::size_of;

/// The byte order of a blob.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    /// The byte order of the running process.
    #[cfg(target_endian = "little")]
    pub const NATIVE: Endian = Endian::Little;
    #[cfg(target_endian = "big")]
    pub const NATIVE: Endian = Endian::Big;

    pub fn swapped(self) -> Endian {
        match self {
            Endian::Little => Endian::Big,
            Endian::Big => Endian::Little,
        }
    }

    pub fn read_u32(self, bytes: [u8; 4]) -> u32 {
        match self {
            Endian::Little => u32::from_le_bytes(bytes),
            Endian::Big => u32::from_be_bytes(bytes),
        }
    }

    pub fn write_u32(self, value: u32) -> [u8; 4] {
        match self {
            Endian::Little => value.to_le_bytes(),
            Endian::Big => value.to_be_bytes(),
        }
    }
}

/// Reverses the bytes of every 4-byte word in `bytes`.
///
/// A trailing partial word is left untouched.
pub fn swap_words(bytes: &mut [u8]) {
    debug_assert_eq!(bytes.len() % 4, 0, "swap_words on a partial word");
    for word in bytes.chunks_exact_mut(4) {
        word.reverse();
    }
}

/// Decides from a natively read byte-order mark whether the blob needs a swap.
pub fn needs_swap(mark: u32) -> Result<bool, SharcError> {
    if mark == BYTE_ORDER_MARK {
        Ok(false)
    } else if mark == BYTE_ORDER_MARK.swap_bytes() {
        Ok(true)
    } else {
        Err(SharcError::InvalidByteOrderMark(mark))
    }
}

/// Fields shared by both archive headers.
pub(crate) trait ArchivePrefix: Signed {
    fn byte_order(&self) -> u32;
    fn file_size(&self) -> u32;
    fn name_len(&self) -> u32;
}

impl ArchivePrefix for ArchiveHeader {
    fn byte_order(&self) -> u32 {
        self.byte_order
    }

    fn file_size(&self) -> u32 {
        self.file_size
    }

    fn name_len(&self) -> u32 {
        self.name_len
    }
}

impl ArchivePrefix for BinaryArchiveHeader {
    fn byte_order(&self) -> u32 {
        self.byte_order
    }

    fn file_size(&self) -> u32 {
        self.file_size
    }

    fn name_len(&self) -> u32 {
        self.name_len
    }
}

pub(crate) fn check_alignment(blob: &[u8]) -> Result<(), SharcError> {
    let address = blob.as_ptr() as usize;
    if address % 4 != 0 {
        return Err(SharcError::Misaligned(address));
    }
    Ok(())
}

/// Resolves and verifies an archive header.
///
/// Returns a walker limited to the archive's declared file size, the header in
/// host order, and the offset just past the archive name. The header stays as
/// stored in the blob until [`Walker::finish`].
///
/// # Panics
/// If the signature or version does not match this build.
pub(crate) fn open_archive<T: ArchivePrefix>(
    blob: &mut [u8],
) -> Result<(Walker<'_>, T, usize), SharcError> {
    check_alignment(blob)?;
    if blob.len() < size_of::<T>() {
        return Err(SharcError::Truncated {
            what: "archive header",
            offset: 0,
            needed: size_of::<T>(),
            available: blob.len(),
        });
    }

    let as_stored: T = bytemuck::pod_read_unaligned(&blob[..size_of::<T>()]);
    let swap = match needs_swap(as_stored.byte_order()) {
        Ok(swap) => swap,
        Err(err) => {
            // A foreign file is far more likely than a damaged mark.
            signature::verify(&as_stored);
            return Err(err);
        }
    };

    let mut header = as_stored;
    if swap {
        swap_words(bytemuck::bytes_of_mut(&mut header));
    }
    signature::verify(&header);

    let mut walker = Walker::new(blob, swap);
    walker.deferred = size_of::<T>();

    let file_size = header.file_size() as usize;
    if file_size % 4 != 0 {
        return Err(SharcError::UnalignedLength {
            what: "archive",
            offset: 0,
            len: header.file_size(),
        });
    }
    walker.ensure("archive", 0, file_size)?;
    walker.limit = file_size;

    let name_end = walker.name_region("archive name", size_of::<T>(), header.name_len(), file_size)?;
    Ok((walker, header, name_end))
}

/// A bounds-checked cursor that optionally swaps what it visits.
pub(crate) struct Walker<'b> {
    blob: &'b mut [u8],
    swap: bool,
    limit: usize,
    /// Leading bytes swapped only by `finish`.
    deferred: usize,
}

impl<'b> Walker<'b> {
    pub fn new(blob: &'b mut [u8], swap: bool) -> Self {
        let limit = blob.len();
        Walker {
            blob,
            swap,
            limit,
            deferred: 0,
        }
    }

    pub fn swaps(&self) -> bool {
        self.swap
    }

    /// Swaps the deferred header, which marks the blob as resolved.
    pub fn finish(self) {
        if self.swap {
            swap_words(&mut self.blob[..self.deferred]);
        }
    }

    pub fn ensure(&self, what: &'static str, offset: usize, needed: usize) -> Result<(), SharcError> {
        self.ensure_within(what, offset, needed, self.limit)
    }

    pub fn ensure_within(
        &self,
        what: &'static str,
        offset: usize,
        needed: usize,
        limit: usize,
    ) -> Result<(), SharcError> {
        let limit = limit.min(self.limit);
        match offset.checked_add(needed) {
            Some(end) if end <= limit => Ok(()),
            _ => Err(SharcError::Truncated {
                what,
                offset,
                needed,
                available: limit.saturating_sub(offset),
            }),
        }
    }

    /// Swaps `len` bytes of whole words at `offset`, which must end before `limit`.
    pub fn words(
        &mut self,
        what: &'static str,
        offset: usize,
        len: usize,
        limit: usize,
    ) -> Result<(), SharcError> {
        if len % 4 != 0 {
            return Err(SharcError::UnalignedLength {
                what,
                offset,
                len: len as u32,
            });
        }
        self.ensure_within(what, offset, len, limit)?;
        if self.swap {
            swap_words(&mut self.blob[offset..offset + len]);
        }
        Ok(())
    }

    /// Swaps the fixed prefix `T` at `offset` and returns it in host order.
    pub fn prefix_within<T: Pod>(
        &mut self,
        what: &'static str,
        offset: usize,
        limit: usize,
    ) -> Result<T, SharcError> {
        self.words(what, offset, size_of::<T>(), limit)?;
        Ok(bytemuck::pod_read_unaligned(
            &self.blob[offset..offset + size_of::<T>()],
        ))
    }

    /// Validates a padded name region and returns the offset just past it.
    pub fn name_region(
        &self,
        what: &'static str,
        offset: usize,
        name_len: u32,
        limit: usize,
    ) -> Result<usize, SharcError> {
        if name_len % 4 != 0 {
            return Err(SharcError::UnalignedLength {
                what,
                offset,
                len: name_len,
            });
        }
        self.ensure_within(what, offset, name_len as usize, limit)?;
        Ok(offset + name_len as usize)
    }

    /// Walks a variable-size array at `offset`, returning its declared size.
    ///
    /// `each` is called with each element's index, offset and host-order prefix
    /// after the prefix has been swapped and the element bounds validated.
    pub fn array<T, F>(
        &mut self,
        what: &'static str,
        offset: usize,
        limit: usize,
        mut each: F,
    ) -> Result<usize, SharcError>
    where
        T: SizedElement,
        F: FnMut(&mut Self, usize, usize, &T) -> Result<(), SharcError>,
    {
        let header: ArrayHeader = self.prefix_within(what, offset, limit)?;
        let size = header.size as usize;
        if size % 4 != 0 {
            return Err(SharcError::UnalignedLength {
                what,
                offset,
                len: header.size,
            });
        }
        if size < size_of::<ArrayHeader>() {
            return Err(SharcError::SizeMismatch {
                what,
                offset,
                declared: header.size,
                actual: size_of::<ArrayHeader>(),
            });
        }
        self.ensure_within(what, offset, size, limit)?;

        let end = offset + size;
        let mut cursor = offset + size_of::<ArrayHeader>();
        for index in 0..header.count as usize {
            let element: T = self.prefix_within(what, cursor, end)?;
            let element_size = element.size() as usize;
            if element_size % 4 != 0 {
                return Err(SharcError::UnalignedLength {
                    what,
                    offset: cursor,
                    len: element.size(),
                });
            }
            if element_size < size_of::<T>() {
                return Err(SharcError::SizeMismatch {
                    what,
                    offset: cursor,
                    declared: element.size(),
                    actual: size_of::<T>(),
                });
            }
            self.ensure_within(what, cursor, element_size, end)?;

            each(self, index, cursor, &element)?;
            cursor += element_size;
        }

        if cursor != end {
            return Err(SharcError::SizeMismatch {
                what,
                offset,
                declared: header.size,
                actual: cursor - offset,
            });
        }

        Ok(size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sharc_sys::MacroHeader;

    #[test]
    fn swap_words_reverses_each_word() {
        let mut bytes = [1, 2, 3, 4, 5, 6, 7, 8];
        swap_words(&mut bytes);
        assert_eq!(bytes, [4, 3, 2, 1, 8, 7, 6, 5]);
    }

    #[test]
    fn byte_order_mark() {
        assert!(!needs_swap(BYTE_ORDER_MARK).unwrap());
        assert!(needs_swap(BYTE_ORDER_MARK.swap_bytes()).unwrap());
        assert!(matches!(
            needs_swap(0x1234),
            Err(SharcError::InvalidByteOrderMark(0x1234))
        ));
    }

    #[test]
    fn endian_words() {
        let e = Endian::Big;
        assert_eq!(e.write_u32(0x0102_0304), [1, 2, 3, 4]);
        assert_eq!(e.read_u32([1, 2, 3, 4]), 0x0102_0304);
        assert_eq!(Endian::NATIVE.swapped().swapped(), Endian::NATIVE);
    }

    fn foreign_words(words: &[u32]) -> Vec<u8> {
        words
            .iter()
            .flat_map(|w| Endian::NATIVE.swapped().write_u32(*w))
            .collect()
    }

    #[test]
    fn array_walk_swaps_prefixes_before_reading_sizes() {
        // Two macro elements of 12 and 16 bytes.
        let mut bytes = foreign_words(&[36, 2, 12, 0, 0, 16, 4, 0, 0x6162_6364]);
        let mut walker = Walker::new(&mut bytes, true);
        let mut seen = Vec::new();
        let size = walker
            .array::<MacroHeader, _>("macro array", 0, 36, |_, index, offset, element| {
                seen.push((index, offset, element.size));
                Ok(())
            })
            .expect("walk should succeed");

        assert_eq!(size, 36);
        assert_eq!(seen, vec![(0, 8, 12), (1, 20, 16)]);
        // The trailing name word is not part of any prefix and stays as stored.
        assert_eq!(&bytes[32..36], &Endian::NATIVE.swapped().write_u32(0x6162_6364));
    }

    #[test]
    fn array_walk_rejects_size_mismatch() {
        let mut bytes: Vec<u8> = [40u32, 1, 12, 0, 0, 0, 0, 0, 0, 0]
            .iter()
            .flat_map(|w| w.to_ne_bytes())
            .collect();
        let mut walker = Walker::new(&mut bytes, false);
        let err = walker
            .array::<MacroHeader, _>("macro array", 0, 40, |_, _, _, _| Ok(()))
            .unwrap_err();
        assert!(matches!(
            err,
            SharcError::SizeMismatch {
                declared: 40,
                actual: 20,
                ..
            }
        ));
    }

    #[test]
    fn array_walk_rejects_escaping_element() {
        let mut bytes: Vec<u8> = [20u32, 1, 64, 0, 0]
            .iter()
            .flat_map(|w| w.to_ne_bytes())
            .collect();
        let mut walker = Walker::new(&mut bytes, false);
        let err = walker
            .array::<MacroHeader, _>("macro array", 0, 20, |_, _, _, _| Ok(()))
            .unwrap_err();
        assert!(matches!(err, SharcError::Truncated { .. }));
    }
}
