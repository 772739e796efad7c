//! Streaming decoder for market depth (`.depth`) files.

use std::{
    fs::File,
    io::{self, BufReader},
    path::Path,
};

use super::{read_chunk, Decode, FromLittleEndianSlice};
use crate::{
    batch::DepthBatch,
    enums::DepthCommand,
    error::{Error, Result},
    flags::FlagSet,
    record::{DepthHeader, DepthRecord},
};

/// Type for decoding market depth files: a validated 64-byte header followed
/// by fixed 24-byte records grouped into batches. The primary unit of
/// decoding is the batch; [`DepthDecoder::decode_record`] exposes the raw
/// record stream for verification passes.
#[derive(Debug)]
pub struct DepthDecoder<R> {
    header: DepthHeader,
    reader: R,
    complete: u64,
}

impl<R> DepthDecoder<R>
where
    R: io::Read,
{
    /// Creates a new [`DepthDecoder`] from `reader`, consuming and validating
    /// the file header.
    ///
    /// # Errors
    /// This function returns an error if reading fails, the input ends before
    /// the header does, or the header's magic number, header size, or record
    /// size are wrong.
    pub fn new(mut reader: R) -> Result<Self> {
        let mut buf = [0u8; crate::DEPTH_HEADER_LEN];
        let read =
            read_chunk(&mut reader, &mut buf).map_err(|e| Error::io(e, "reading depth header"))?;
        if read != buf.len() {
            return Err(Error::TruncatedStream {
                complete: 0,
                trailing: read as u64,
                context: "reading depth header".to_owned(),
            });
        }
        let header = decode_header(&buf)?;
        Ok(Self {
            header,
            reader,
            complete: 0,
        })
    }

    /// Returns the file header, preserved verbatim for the rewrite.
    pub fn header(&self) -> &DepthHeader {
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
    /// This function returns an error if the underlying reader fails, the
    /// input ends partway through a record, or the record carries an unknown
    /// command code.
    pub fn decode_record(&mut self) -> Result<Option<DepthRecord>> {
        let mut buf = [0u8; crate::DEPTH_RECORD_LEN];
        let read = read_chunk(&mut self.reader, &mut buf)
            .map_err(|e| Error::io(e, "decoding depth record"))?;
        match read {
            0 => Ok(None),
            n if n == buf.len() => {
                let record = decode_record(&buf)?;
                self.complete += 1;
                Ok(Some(record))
            }
            n => Err(Error::TruncatedStream {
                complete: self.complete,
                trailing: n as u64,
                context: "decoding depth record".to_owned(),
            }),
        }
    }

    /// Tries to decode the next batch: the maximal run of records ending at a
    /// set `END_OF_BATCH` flag. Returns `Ok(None)` when the input is
    /// exhausted on a batch boundary.
    ///
    /// # Errors
    /// This function returns an error if record decoding fails, the input
    /// ends before the batch terminator, or the batch breaks the structure
    /// rules (a timestamp change or a bid-side record after an ask-side
    /// record before the terminator).
    pub fn decode_batch(&mut self) -> Result<Option<DepthBatch>> {
        let Some(first) = self.decode_record()? else {
            return Ok(None);
        };
        let mut done = first.is_end_of_batch();
        let mut records = vec![first];
        while !done {
            match self.decode_record()? {
                Some(record) => {
                    done = record.is_end_of_batch();
                    records.push(record);
                }
                None => {
                    return Err(Error::TruncatedStream {
                        complete: self.complete,
                        trailing: 0,
                        context: "reading a depth batch terminator".to_owned(),
                    })
                }
            }
        }
        DepthBatch::from_records(records).map(Some)
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

impl DepthDecoder<BufReader<File>> {
    /// Creates a [`DepthDecoder`] from the file at `path`. The file is opened
    /// for shared reading; the platform writing it may still hold it open.
    ///
    /// # Errors
    /// This function returns an error if the file cannot be opened or its
    /// header cannot be read and validated.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref()).map_err(|e| {
            Error::io(
                e,
                format!("opening depth file at path '{}'", path.as_ref().display()),
            )
        })?;
        Self::new(BufReader::new(file))
    }
}

impl<R> Decode for DepthDecoder<R>
where
    R: io::Read,
{
    type Item = DepthBatch;

    fn decode(&mut self) -> Result<Option<DepthBatch>> {
        self.decode_batch()
    }
}

fn decode_header(buf: &[u8; crate::DEPTH_HEADER_LEN]) -> Result<DepthHeader> {
    let magic = u32::from_le_slice(&buf[0..]);
    if magic != crate::DEPTH_MAGIC {
        return Err(Error::BadMagic { found: magic });
    }
    let header_size = u32::from_le_slice(&buf[4..]);
    if header_size != crate::DEPTH_HEADER_LEN as u32 {
        return Err(Error::BadHeaderSize { found: header_size });
    }
    let record_size = u32::from_le_slice(&buf[8..]);
    if record_size != crate::DEPTH_RECORD_LEN as u32 {
        return Err(Error::BadRecordSize { found: record_size });
    }
    let mut reserved = [0u8; 48];
    reserved.copy_from_slice(&buf[16..]);
    Ok(DepthHeader {
        magic,
        header_size,
        record_size,
        version: u32::from_le_slice(&buf[12..]),
        reserved,
    })
}

fn decode_record(buf: &[u8; crate::DEPTH_RECORD_LEN]) -> Result<DepthRecord> {
    let raw_command = buf[8];
    let command = DepthCommand::try_from(raw_command)
        .map_err(|_| Error::decode(format!("unknown depth command {raw_command:#04x}")))?;
    Ok(DepthRecord {
        sc_us: u64::from_le_slice(&buf[0..]),
        command,
        flags: FlagSet::new(buf[9]),
        num_orders: u16::from_le_slice(&buf[10..]),
        price: f32::from_le_slice(&buf[12..]),
        quantity: u32::from_le_slice(&buf[16..]),
        reserved: u32::from_le_slice(&buf[20..]),
    })
}
