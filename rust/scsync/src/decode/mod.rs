//! Decoding the intraday and market depth file formats. Decoders are
//! pull-based: each call decodes one item and `Ok(None)` marks a clean end of
//! input, so a partial trailing record is distinguishable as
//! [`Error::TruncatedStream`](crate::Error::TruncatedStream).

pub mod depth;
pub mod intraday;

// Re-exports
pub use self::{depth::DepthDecoder, intraday::IntradayDecoder};

use std::{io, mem};

use fallible_streaming_iterator::FallibleStreamingIterator;

use crate::error::{Error, Result};

/// Trait for pull-based decoders of one item type.
pub trait Decode {
    /// The decoded item type.
    type Item;

    /// Tries to decode the next item. Returns `Ok(None)` when the input is
    /// exhausted on an item boundary.
    ///
    /// # Errors
    /// This function returns an error if the underlying reader fails or the
    /// input ends partway through an item.
    fn decode(&mut self) -> Result<Option<Self::Item>>;

    /// Eagerly decodes all remaining items into a `Vec`.
    ///
    /// # Errors
    /// This function returns an error if the underlying reader fails or the
    /// input ends partway through an item.
    fn decode_all(mut self) -> Result<Vec<Self::Item>>
    where
        Self: Sized,
    {
        let mut res = Vec::new();
        while let Some(item) = self.decode()? {
            res.push(item);
        }
        Ok(res)
    }

    /// Converts the decoder into a lazy streaming iterator.
    fn decode_stream(self) -> StreamIter<Self>
    where
        Self: Sized,
    {
        StreamIter::new(self)
    }
}

/// A consuming iterator wrapping a [`Decode`] implementation. Lazily decodes
/// the contents of the input stream.
///
/// Implements [`FallibleStreamingIterator`].
pub struct StreamIter<D: Decode> {
    decoder: D,
    current: Option<D::Item>,
}

impl<D: Decode> StreamIter<D> {
    /// Creates a new streaming iterator using the given `decoder`.
    pub fn new(decoder: D) -> Self {
        Self {
            decoder,
            current: None,
        }
    }
}

impl<D: Decode> FallibleStreamingIterator for StreamIter<D> {
    type Error = Error;
    type Item = D::Item;

    fn advance(&mut self) -> Result<()> {
        match self.decoder.decode() {
            Ok(item) => {
                self.current = item;
                Ok(())
            }
            Err(err) => {
                // set error state sentinel
                self.current = None;
                Err(err)
            }
        }
    }

    fn get(&self) -> Option<&Self::Item> {
        self.current.as_ref()
    }
}

/// Fills `buf` from `reader`, returning how many bytes were read. A return
/// shorter than `buf` means the input ended; callers turn a nonzero short
/// read into a truncation error.
pub(crate) fn read_chunk<R: io::Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

pub(crate) trait FromLittleEndianSlice {
    fn from_le_slice(slice: &[u8]) -> Self;
}

impl FromLittleEndianSlice for u64 {
    /// NOTE: assumes the length of `slice` is at least 8 bytes
    fn from_le_slice(slice: &[u8]) -> Self {
        let (bytes, _) = slice.split_at(mem::size_of::<Self>());
        Self::from_le_bytes(bytes.try_into().unwrap())
    }
}

impl FromLittleEndianSlice for u32 {
    /// NOTE: assumes the length of `slice` is at least 4 bytes
    fn from_le_slice(slice: &[u8]) -> Self {
        let (bytes, _) = slice.split_at(mem::size_of::<Self>());
        Self::from_le_bytes(bytes.try_into().unwrap())
    }
}

impl FromLittleEndianSlice for u16 {
    /// NOTE: assumes the length of `slice` is at least 2 bytes
    fn from_le_slice(slice: &[u8]) -> Self {
        let (bytes, _) = slice.split_at(mem::size_of::<Self>());
        Self::from_le_bytes(bytes.try_into().unwrap())
    }
}

impl FromLittleEndianSlice for f32 {
    /// NOTE: assumes the length of `slice` is at least 4 bytes
    fn from_le_slice(slice: &[u8]) -> Self {
        Self::from_bits(u32::from_le_slice(slice))
    }
}
