//! Zero-copy typed views over an archive blob.
//!
//! A view borrows the blob and reinterprets its bytes in place; nothing is
//! deserialized. Views built from malformed bytes are *invalid* rather than
//! out of bounds.

use crate::error::VerifyError;
use crate::signature::{self, Signed};
use bytemuck::Pod;
use sharc_sys::{ArrayHeader, NamedElement, SizedElement};
use std::iter::FusedIterator;
use std::marker::PhantomData;
use std::mem::size_of;

/// A typed view of a fixed prefix `T` and the bytes of the region it heads.
pub struct ResView<'a, T> {
    bytes: &'a [u8],
    data: Option<&'a T>,
}

impl<T> Clone for ResView<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ResView<'_, T> {}

impl<'a, T: Pod> ResView<'a, T> {
    /// Views `bytes` as a `T` prefix followed by trailing data.
    ///
    /// The view is invalid if `bytes` is too short or not aligned for `T`.
    pub fn new(bytes: &'a [u8]) -> Self {
        let data = bytes
            .get(..size_of::<T>())
            .and_then(|prefix| bytemuck::try_from_bytes(prefix).ok());
        ResView { bytes, data }
    }

    pub fn invalid() -> Self {
        ResView {
            bytes: &[],
            data: None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.data.is_some()
    }

    /// The fixed prefix.
    ///
    /// # Panics
    /// If the view is invalid.
    #[track_caller]
    pub fn data(&self) -> &'a T {
        match self.data {
            Some(data) => data,
            None => panic!("access through an invalid {}", std::any::type_name::<T>()),
        }
    }

    pub fn try_data(&self) -> Option<&'a T> {
        self.data
    }

    /// All bytes of the region, prefix included.
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// The bytes following the prefix.
    pub fn trailing(&self) -> &'a [u8] {
        self.bytes.get(size_of::<T>()..).unwrap_or(&[])
    }

    /// `len` bytes at `offset` from the start of the region, or empty if out of bounds.
    pub fn region(&self, offset: usize, len: usize) -> &'a [u8] {
        offset
            .checked_add(len)
            .and_then(|end| self.bytes.get(offset..end))
            .unwrap_or(&[])
    }
}

impl<'a, T: Signed> ResView<'a, T> {
    /// Compares signature and version with this build.
    pub fn check(&self) -> Result<(), VerifyError> {
        signature::check(self.data())
    }

    /// # Panics
    /// If the signature or version does not match this build.
    #[track_caller]
    pub fn verify(&self) {
        signature::verify(self.data())
    }
}

impl<'a, T: NamedElement> ResView<'a, T> {
    pub fn name(&self) -> &'a str {
        match self.data {
            Some(data) => read_str(self.region(size_of::<T>(), data.name_len() as usize)),
            None => "",
        }
    }

    /// Offset of the first byte after the name region.
    pub fn name_end(&self) -> usize {
        size_of::<T>() + self.data.map_or(0, |data| data.name_len() as usize)
    }
}

/// Reads a NUL-terminated string from the start of `bytes`.
///
/// Reads to the end of `bytes` when there is no terminator. Invalid UTF-8
/// reads as an empty string.
pub fn read_str(bytes: &[u8]) -> &str {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    std::str::from_utf8(&bytes[..end]).unwrap_or_default()
}

/// A typed element of a [`ResArray`].
pub trait ResElement<'a>: Sized {
    type Data: SizedElement;

    fn from_view(view: ResView<'a, Self::Data>) -> Self;
}

impl<'a, T: SizedElement> ResElement<'a> for ResView<'a, T> {
    type Data = T;

    fn from_view(view: ResView<'a, T>) -> Self {
        view
    }
}

/// A header followed by a declared number of self-sized elements.
///
/// Elements carry their own byte size, so an element can only be reached by
/// walking every element before it.
pub struct ResArray<'a, E> {
    bytes: &'a [u8],
    count: usize,
    _marker: PhantomData<fn() -> E>,
}

impl<E> Clone for ResArray<'_, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for ResArray<'_, E> {}

impl<'a, E: ResElement<'a>> ResArray<'a, E> {
    /// Views the array starting at `bytes`; trailing bytes past its declared size are ignored.
    pub fn new(bytes: &'a [u8]) -> Self {
        let header = ResView::<ArrayHeader>::new(bytes);
        match header.try_data() {
            Some(data) if data.size as usize >= size_of::<ArrayHeader>() => {
                match bytes.get(..data.size as usize) {
                    Some(bytes) => ResArray {
                        bytes,
                        count: data.count as usize,
                        _marker: PhantomData,
                    },
                    None => Self::invalid(),
                }
            }
            _ => Self::invalid(),
        }
    }

    pub fn invalid() -> Self {
        ResArray {
            bytes: &[],
            count: 0,
            _marker: PhantomData,
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.bytes.is_empty()
    }

    /// The declared element count.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// The declared byte size, header included.
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn iter(&self) -> ResArrayIter<'a, E> {
        ResArrayIter {
            bytes: self.bytes,
            offset: size_of::<ArrayHeader>(),
            index: 0,
            count: self.count,
            _marker: PhantomData,
        }
    }

    /// The `n`th element, found by a linear walk.
    ///
    /// `n == len()` is allowed and yields `None`.
    ///
    /// # Panics
    /// If `n > len()`.
    #[track_caller]
    pub fn get(&self, n: usize) -> Option<E> {
        assert!(n <= self.count, "index {n} past array of {}", self.count);
        self.iter().nth(n)
    }

    /// Walks the array once and records every element offset.
    pub fn index(&self) -> IndexedResArray<'a, E> {
        let mut offsets = Vec::with_capacity(self.count);
        let mut iter = self.iter();
        loop {
            let offset = iter.offset();
            if iter.next().is_none() {
                break;
            }
            offsets.push(offset);
        }
        IndexedResArray {
            array: *self,
            offsets,
        }
    }
}

impl<'a, E: ResElement<'a>> IntoIterator for ResArray<'a, E> {
    type Item = E;
    type IntoIter = ResArrayIter<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Forward iterator over a [`ResArray`].
///
/// Stops at the declared count, or early if an element's size would leave the array.
pub struct ResArrayIter<'a, E> {
    bytes: &'a [u8],
    offset: usize,
    index: usize,
    count: usize,
    _marker: PhantomData<fn() -> E>,
}

impl<'a, E> ResArrayIter<'a, E> {
    /// Byte offset of the next element from the start of the array.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Index of the next element.
    pub fn index(&self) -> usize {
        self.index
    }

    fn stop(&mut self) {
        self.index = self.count;
    }
}

impl<'a, E: ResElement<'a>> Iterator for ResArrayIter<'a, E> {
    type Item = E;

    fn next(&mut self) -> Option<E> {
        if self.index >= self.count {
            return None;
        }

        let rest = self.bytes.get(self.offset..).unwrap_or(&[]);
        let size = ResView::<E::Data>::new(rest)
            .try_data()
            .map(|data| data.size() as usize)
            .filter(|&size| size >= size_of::<E::Data>() && size % 4 == 0);
        let element = match size.and_then(|size| rest.get(..size)) {
            Some(element) => element,
            None => {
                self.stop();
                return None;
            }
        };

        self.offset += element.len();
        self.index += 1;
        Some(E::from_view(ResView::new(element)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.count - self.index))
    }
}

impl<'a, E: ResElement<'a>> FusedIterator for ResArrayIter<'a, E> {}

/// A [`ResArray`] with a precomputed offset table for repeated random access.
pub struct IndexedResArray<'a, E> {
    array: ResArray<'a, E>,
    offsets: Vec<usize>,
}

impl<'a, E: ResElement<'a>> IndexedResArray<'a, E> {
    /// The number of elements reachable by walking; equals the declared count for a valid array.
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    pub fn array(&self) -> ResArray<'a, E> {
        self.array
    }

    pub fn get(&self, n: usize) -> Option<E> {
        let offset = *self.offsets.get(n)?;
        let rest = &self.array.bytes[offset..];
        let size = ResView::<E::Data>::new(rest).data().size() as usize;
        Some(E::from_view(ResView::new(&rest[..size])))
    }
}

/// Returns the offset just past the array at `offset` in `bytes`.
pub(crate) fn skip_array(bytes: &[u8], offset: usize) -> Option<usize> {
    let header = ResView::<ArrayHeader>::new(bytes.get(offset..)?).try_data()?;
    offset.checked_add(header.size as usize)
}

/// The `n`th array of a run of consecutive arrays starting at `offset`.
pub(crate) fn nth_array<'a, E: ResElement<'a>>(
    bytes: &'a [u8],
    offset: usize,
    n: usize,
) -> ResArray<'a, E> {
    let mut offset = Some(offset);
    for _ in 0..n {
        offset = offset.and_then(|offset| skip_array(bytes, offset));
    }
    match offset.and_then(|offset| bytes.get(offset..)) {
        Some(rest) => ResArray::new(rest),
        None => ResArray::invalid(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sharc_sys::MacroHeader;

    fn words(words: &[u32]) -> Vec<u32> {
        words.to_vec()
    }

    #[test]
    fn invalid_view() {
        let view = ResView::<ArrayHeader>::invalid();
        assert!(!view.is_valid());
        assert!(view.try_data().is_none());
        assert_eq!(view.trailing(), &[] as &[u8]);
    }

    #[test]
    #[should_panic(expected = "invalid")]
    fn invalid_view_data_panics() {
        ResView::<ArrayHeader>::invalid().data();
    }

    #[test]
    fn read_str_stops_at_nul() {
        assert_eq!(read_str(b"abc\0def"), "abc");
        assert_eq!(read_str(b"abc"), "abc");
        assert_eq!(read_str(&[0xff, 0]), "");
    }

    #[test]
    fn traversal_visits_declared_count_at_cumulative_offsets() {
        let blob = words(&[
            8 + 12 + 20 + 16, 3,
            12, 0, 0,
            20, 8, 0, 0x0063_6261, 0,
            16, 4, 0, 0x0078_0000,
        ]);
        let bytes: &[u8] = bytemuck::cast_slice(&blob);
        let array = ResArray::<ResView<MacroHeader>>::new(bytes);

        assert!(array.is_valid());
        assert_eq!(array.len(), 3);

        let sizes: Vec<u32> = array.iter().map(|e| e.data().size).collect();
        assert_eq!(sizes, vec![12, 20, 16]);

        let indexed = array.index();
        assert_eq!(indexed.offsets(), &[8, 20, 40]);
        assert_eq!(indexed.get(1).unwrap().data().name_len, 8);
        assert!(indexed.get(3).is_none());

        assert_eq!(array.get(2).unwrap().data().size, 16);
        assert!(array.get(3).is_none());

        // Restartable.
        assert_eq!(array.iter().count(), 3);
        assert_eq!(array.iter().count(), 3);
    }

    #[test]
    #[should_panic(expected = "past array")]
    fn get_past_count_panics() {
        let blob = words(&[8, 0]);
        let array = ResArray::<ResView<MacroHeader>>::new(bytemuck::cast_slice(&blob));
        array.get(1);
    }

    #[test]
    fn traversal_stops_on_escaping_element() {
        let blob = words(&[20, 2, 12, 0, 0]);
        let array = ResArray::<ResView<MacroHeader>>::new(bytemuck::cast_slice(&blob));
        assert_eq!(array.iter().count(), 1);
    }

    #[test]
    fn declared_size_past_blob_is_invalid() {
        let blob = words(&[64, 1]);
        let array = ResArray::<ResView<MacroHeader>>::new(bytemuck::cast_slice(&blob));
        assert!(!array.is_valid());
        assert_eq!(array.iter().count(), 0);
    }
}
