//! Streaming decoder for intraday (`.scid`) tick and bar files.

use std::{
    fs::File,
    io::{self, BufReader},
    path::Path,
};

use super::{read_chunk, Decode, FromLittleEndianSlice};
use crate::{
    error::{Error, Result},
    record::{IntradayHeader, IntradayRecord},
};

/// Type for decoding intraday files: a 56-byte header followed by fixed
/// 40-byte records in timestamp order.
#[derive(Debug)]
pub struct IntradayDecoder<R> {
    header: IntradayHeader,
    reader: R,
    complete: u64,
}

impl<R> IntradayDecoder<R>
where
    R: io::Read,
{
    /// Creates a new [`IntradayDecoder`] from `reader`, consuming the file
    /// header. A zero-length input is accepted and given a default header so
    /// an empty trading day still rewrites cleanly.
    ///
    /// # Errors
    /// This function returns an error if reading fails or the input ends
    /// partway through the header.
    pub fn new(mut reader: R) -> Result<Self> {
        let mut raw = [0u8; crate::INTRADAY_HEADER_LEN];
        let read =
            read_chunk(&mut reader, &mut raw).map_err(|e| Error::io(e, "reading intraday header"))?;
        let header = match read {
            0 => IntradayHeader::default(),
            n if n == raw.len() => IntradayHeader::new(raw),
            n => {
                return Err(Error::TruncatedStream {
                    complete: 0,
                    trailing: n as u64,
                    context: "reading intraday header".to_owned(),
                })
            }
        };
        Ok(Self {
            header,
            reader,
            complete: 0,
        })
    }

    /// Returns the file header, preserved byte-for-byte for the rewrite.
    pub fn header(&self) -> &IntradayHeader {
        &self.header
    }

    /// The number of complete records decoded so far.
    pub fn records_decoded(&self) -> u64 {
        self.complete
    }

    /// Tries to decode the next record. Returns `Ok(None)` when the input is
    /// exhausted on a record boundary.
    ///
    /// # Errors
    /// This function returns an error if the underlying reader fails or the
    /// input ends partway through a record.
    pub fn decode(&mut self) -> Result<Option<IntradayRecord>> {
        let mut buf = [0u8; crate::INTRADAY_RECORD_LEN];
        let read = read_chunk(&mut self.reader, &mut buf)
            .map_err(|e| Error::io(e, "decoding intraday record"))?;
        match read {
            0 => Ok(None),
            n if n == buf.len() => {
                self.complete += 1;
                Ok(Some(decode_record(&buf)))
            }
            n => Err(Error::TruncatedStream {
                complete: self.complete,
                trailing: n as u64,
                context: "decoding intraday record".to_owned(),
            }),
        }
    }

    /// Returns a mutable reference to the inner reader.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    /// Returns a reference to the inner reader.
    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    /// Consumes the decoder and returns the inner reader.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl IntradayDecoder<BufReader<File>> {
    /// Creates an [`IntradayDecoder`] from the file at `path`. The file is
    /// opened for shared reading; the platform writing it may still hold it
    /// open.
    ///
    /// # Errors
    /// This function returns an error if the file cannot be opened or its
    /// header cannot be read.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref()).map_err(|e| {
            Error::io(
                e,
                format!(
                    "opening intraday file at path '{}'",
                    path.as_ref().display()
                ),
            )
        })?;
        Self::new(BufReader::new(file))
    }
}

impl<R> Decode for IntradayDecoder<R>
where
    R: io::Read,
{
    type Item = IntradayRecord;

    fn decode(&mut self) -> Result<Option<IntradayRecord>> {
        IntradayDecoder::decode(self)
    }
}

fn decode_record(buf: &[u8; crate::INTRADAY_RECORD_LEN]) -> IntradayRecord {
    IntradayRecord {
        sc_us: u64::from_le_slice(&buf[0..]),
        open_bits: u32::from_le_slice(&buf[8..]),
        high: f32::from_le_slice(&buf[12..]),
        low: f32::from_le_slice(&buf[16..]),
        close: f32::from_le_slice(&buf[20..]),
        num_trades: u32::from_le_slice(&buf[24..]),
        total_volume: u32::from_le_slice(&buf[28..]),
        bid_volume: u32::from_le_slice(&buf[32..]),
        ask_volume: u32::from_le_slice(&buf[36..]),
    }
}
