//! Encoder for intraday (`.scid`) tick and bar files.

use std::io;

use crate::{
    error::{Error, Result},
    record::{IntradayHeader, IntradayRecord},
};

/// Type for encoding intraday files. Writes the 56-byte header on
/// construction, then fixed 40-byte records.
pub struct IntradayEncoder<W>
where
    W: io::Write,
{
    writer: W,
    records_written: u64,
}

impl<W> IntradayEncoder<W>
where
    W: io::Write,
{
    /// Creates a new [`IntradayEncoder`] that will write to `writer`,
    /// emitting `header` byte-for-byte.
    ///
    /// # Errors
    /// This function returns an error if it fails to write the header.
    pub fn new(mut writer: W, header: &IntradayHeader) -> Result<Self> {
        writer
            .write_all(&header.raw)
            .map_err(|e| Error::io(e, "writing intraday header"))?;
        Ok(Self {
            writer,
            records_written: 0,
        })
    }

    /// Encodes a single record. The `open` field is written from its raw
    /// bits, so sentinel patterns survive byte-exactly.
    ///
    /// # Errors
    /// This function returns an error if it fails to write to the underlying
    /// writer.
    pub fn encode_record(&mut self, record: &IntradayRecord) -> Result<()> {
        let mut buf = [0u8; crate::INTRADAY_RECORD_LEN];
        buf[0..8].copy_from_slice(&record.sc_us.to_le_bytes());
        buf[8..12].copy_from_slice(&record.open_bits.to_le_bytes());
        buf[12..16].copy_from_slice(&record.high.to_le_bytes());
        buf[16..20].copy_from_slice(&record.low.to_le_bytes());
        buf[20..24].copy_from_slice(&record.close.to_le_bytes());
        buf[24..28].copy_from_slice(&record.num_trades.to_le_bytes());
        buf[28..32].copy_from_slice(&record.total_volume.to_le_bytes());
        buf[32..36].copy_from_slice(&record.bid_volume.to_le_bytes());
        buf[36..40].copy_from_slice(&record.ask_volume.to_le_bytes());
        self.writer
            .write_all(&buf)
            .map_err(|e| Error::io(e, "writing intraday record"))?;
        self.records_written += 1;
        Ok(())
    }

    /// Encodes a slice of records and flushes.
    ///
    /// # Errors
    /// This function returns an error if it fails to write to the underlying
    /// writer.
    pub fn encode_records(&mut self, records: &[IntradayRecord]) -> Result<()> {
        for record in records {
            self.encode_record(record)?;
        }
        self.flush()
    }

    /// Flushes any buffered content to the true output.
    ///
    /// # Errors
    /// This function returns an error if it's unable to flush the underlying
    /// writer.
    pub fn flush(&mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| Error::io(e, "flushing intraday output"))
    }

    /// The number of records written so far.
    pub fn records_written(&self) -> u64 {
        self.records_written
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
}

#[cfg(test)]
mod tests {
    use crate::decode::{Decode, IntradayDecoder};

    use super::*;

    fn single_trade(sc_us: u64, open_bits: u32) -> IntradayRecord {
        IntradayRecord {
            sc_us,
            open_bits,
            high: 100.25,
            low: 100.0,
            close: 100.25,
            num_trades: 1,
            total_volume: 3,
            bid_volume: 0,
            ask_volume: 3,
        }
    }

    #[test]
    fn round_trips_byte_identically() {
        let records = vec![
            single_trade(10, crate::SINGLE_TRADE_BITS),
            single_trade(11, crate::FIRST_SUB_TRADE_BITS),
            single_trade(12, crate::LAST_SUB_TRADE_BITS),
            single_trade(13, crate::INJECTED_TICK_BITS),
        ];
        let mut header = IntradayHeader::default();
        header.raw[20] = 0x5A;
        let mut encoder = IntradayEncoder::new(Vec::new(), &header).unwrap();
        encoder.encode_records(&records).unwrap();
        let bytes = encoder.into_inner();
        assert_eq!(bytes.len(), 56 + 40 * records.len());

        let decoder = IntradayDecoder::new(std::io::Cursor::new(bytes.clone())).unwrap();
        assert_eq!(decoder.header(), &header);
        let decoded = decoder.decode_all().unwrap();
        assert_eq!(decoded, records);

        let mut encoder = IntradayEncoder::new(Vec::new(), &header).unwrap();
        encoder.encode_records(&decoded).unwrap();
        assert_eq!(encoder.into_inner(), bytes);
    }
}
