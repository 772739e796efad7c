//! Encoder for market depth (`.depth`) files.

use std::io;

use crate::{
    batch::DepthBatch,
    error::{Error, Result},
    record::{DepthHeader, DepthRecord},
};

/// Type for encoding market depth files. Writes the 64-byte header on
/// construction, then batches of fixed 24-byte records, re-setting the
/// `END_OF_BATCH` flag on each batch's last record.
pub struct DepthEncoder<W>
where
    W: io::Write,
{
    writer: W,
    records_written: u64,
    batches_written: u64,
}

impl<W> DepthEncoder<W>
where
    W: io::Write,
{
    /// Creates a new [`DepthEncoder`] that will write to `writer`. The
    /// header's version word and reserved bytes are reproduced verbatim.
    ///
    /// # Errors
    /// This function returns an error if it fails to write the header.
    pub fn new(mut writer: W, header: &DepthHeader) -> Result<Self> {
        let mut buf = [0u8; crate::DEPTH_HEADER_LEN];
        buf[0..4].copy_from_slice(&header.magic.to_le_bytes());
        buf[4..8].copy_from_slice(&header.header_size.to_le_bytes());
        buf[8..12].copy_from_slice(&header.record_size.to_le_bytes());
        buf[12..16].copy_from_slice(&header.version.to_le_bytes());
        buf[16..].copy_from_slice(&header.reserved);
        writer
            .write_all(&buf)
            .map_err(|e| Error::io(e, "writing depth header"))?;
        Ok(Self {
            writer,
            records_written: 0,
            batches_written: 0,
        })
    }

    /// Encodes one batch. The last record gets the `END_OF_BATCH` flag, every
    /// earlier record has it cleared; all other flag bits pass through.
    /// Bid-before-ask ordering is a [`DepthBatch`] construction invariant and
    /// is not re-checked here.
    ///
    /// # Errors
    /// This function returns an error if the batch is empty, a record carries
    /// a nonzero reserved field, or writing fails.
    pub fn encode_batch(&mut self, batch: &DepthBatch) -> Result<()> {
        let records = batch.records();
        let Some(last_idx) = records.len().checked_sub(1) else {
            return Err(Error::bad_argument("batch", "no records"));
        };
        for (idx, record) in records.iter().enumerate() {
            let mut record = *record;
            if idx == last_idx {
                record.flags.set_end_of_batch();
            } else {
                record.flags.clear_end_of_batch();
            }
            self.encode_record(&record)?;
        }
        self.batches_written += 1;
        Ok(())
    }

    /// Flushes any buffered content to the true output.
    ///
    /// # Errors
    /// This function returns an error if it's unable to flush the underlying
    /// writer.
    pub fn flush(&mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| Error::io(e, "flushing depth output"))
    }

    /// The number of records written so far.
    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    /// The number of batches written so far.
    pub fn batches_written(&self) -> u64 {
        self.batches_written
    }

    /// Returns a reference to the underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Returns a mutable reference to the underlying writer.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Consumes the encoder and returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn encode_record(&mut self, record: &DepthRecord) -> Result<()> {
        if record.reserved != 0 {
            return Err(Error::encode(format!(
                "nonzero reserved field {:#010x} in depth record at {}",
                record.reserved, record.sc_us
            )));
        }
        let mut buf = [0u8; crate::DEPTH_RECORD_LEN];
        buf[0..8].copy_from_slice(&record.sc_us.to_le_bytes());
        buf[8] = record.command.into();
        buf[9] = record.flags.raw();
        buf[10..12].copy_from_slice(&record.num_orders.to_le_bytes());
        buf[12..16].copy_from_slice(&record.price.to_le_bytes());
        buf[16..20].copy_from_slice(&record.quantity.to_le_bytes());
        buf[20..24].copy_from_slice(&record.reserved.to_le_bytes());
        self.writer
            .write_all(&buf)
            .map_err(|e| Error::io(e, "writing depth record"))?;
        self.records_written += 1;
        Ok(())
    }
}
