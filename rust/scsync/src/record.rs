//! On-disk record and header layouts for the intraday (`.scid`) and market
//! depth (`.depth`) file formats.
//!
//! Both formats are little-endian with fixed-size records. Field-level byte
//! codecs live in [`decode`](crate::decode) and [`encode`](crate::encode);
//! the types here carry the decoded values plus the raw bytes that must
//! survive a rewrite verbatim.

use crate::{
    enums::{DepthCommand, Side, TickClass},
    flags::FlagSet,
};

/// The 56-byte header of an intraday file, preserved verbatim on rewrite.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IntradayHeader {
    /// The raw header bytes as read from the input.
    pub raw: [u8; crate::INTRADAY_HEADER_LEN],
}

impl IntradayHeader {
    /// Creates a header from raw bytes.
    pub const fn new(raw: [u8; crate::INTRADAY_HEADER_LEN]) -> Self {
        Self { raw }
    }
}

impl Default for IntradayHeader {
    /// A well-formed header for outputs whose input had none: `SCID` magic,
    /// header size 56, record size 40, format version 1.
    fn default() -> Self {
        let mut raw = [0; crate::INTRADAY_HEADER_LEN];
        raw[0..4].copy_from_slice(&crate::INTRADAY_MAGIC.to_le_bytes());
        raw[4..8].copy_from_slice(&(crate::INTRADAY_HEADER_LEN as u32).to_le_bytes());
        raw[8..12].copy_from_slice(&(crate::INTRADAY_RECORD_LEN as u32).to_le_bytes());
        raw[12..14].copy_from_slice(&1u16.to_le_bytes());
        Self { raw }
    }
}

/// A 40-byte intraday tick or bar record.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IntradayRecord {
    /// Microseconds since 1899-12-30 00:00:00 UTC. The sub-millisecond digits
    /// are a per-millisecond sequence counter, not physical time.
    pub sc_us: u64,
    /// The raw bits of the `open` field. Held as bits rather than a float
    /// because every consumer compares it bitwise: three sentinel patterns
    /// and the injected-record marker live here, one of them a NaN.
    pub open_bits: u32,
    /// The high of an aggregated bar, or the ask at the time of a trade.
    pub high: f32,
    /// The low of an aggregated bar, or the bid at the time of a trade.
    pub low: f32,
    /// The close of an aggregated bar, or the trade price.
    pub close: f32,
    /// The number of trades in the record.
    pub num_trades: u32,
    /// The total traded volume.
    pub total_volume: u32,
    /// The volume that traded at the bid.
    pub bid_volume: u32,
    /// The volume that traded at the ask.
    pub ask_volume: u32,
}

impl IntradayRecord {
    /// Returns the `open` field as a float.
    pub fn open(&self) -> f32 {
        f32::from_bits(self.open_bits)
    }

    /// Classifies the record by the bit pattern of its `open` field.
    pub const fn tick_class(&self) -> TickClass {
        TickClass::from_open_bits(self.open_bits)
    }

    /// Returns `true` if this record is the per-batch marker injected into
    /// the trades output during synchronization.
    pub const fn is_injected(&self) -> bool {
        self.open_bits == crate::INJECTED_TICK_BITS
    }

    /// Infers which side of the book the trade consumed: `close` bit-equal to
    /// `high` means the trade lifted the ask, bit-equal to `low` means it hit
    /// the bid. `None` when neither matches (or both fields are equal), in
    /// which case callers consider both sides.
    pub fn aggressor_side(&self) -> Option<Side> {
        let close = self.close.to_bits();
        match (close == self.high.to_bits(), close == self.low.to_bits()) {
            (true, false) => Some(Side::Ask),
            (false, true) => Some(Side::Bid),
            _ => None,
        }
    }
}

/// The 64-byte header of a depth file. The first three words are validated;
/// the version word and trailing bytes are preserved verbatim on rewrite.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DepthHeader {
    /// Must equal [`DEPTH_MAGIC`](crate::DEPTH_MAGIC).
    pub magic: u32,
    /// Must equal 64.
    pub header_size: u32,
    /// Must equal 24.
    pub record_size: u32,
    /// The format version word, preserved verbatim.
    pub version: u32,
    /// Trailing padding, preserved verbatim.
    pub reserved: [u8; 48],
}

impl Default for DepthHeader {
    fn default() -> Self {
        Self {
            magic: crate::DEPTH_MAGIC,
            header_size: crate::DEPTH_HEADER_LEN as u32,
            record_size: crate::DEPTH_RECORD_LEN as u32,
            version: 1,
            reserved: [0; 48],
        }
    }
}

/// A 24-byte market depth record.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DepthRecord {
    /// Microseconds since 1899-12-30 00:00:00 UTC, millisecond precision;
    /// order within a millisecond comes from batch boundaries.
    pub sc_us: u64,
    /// The book operation.
    pub command: DepthCommand,
    /// The record's flag byte; bit 0 terminates a batch.
    pub flags: FlagSet,
    /// The number of orders resting at the price level.
    pub num_orders: u16,
    /// The price level.
    pub price: f32,
    /// The quantity resting at the price level.
    pub quantity: u32,
    /// Must be zero on disk and is preserved zero on rewrite.
    pub reserved: u32,
}

impl DepthRecord {
    /// Returns the side the record operates on, or `None` for a book clear.
    pub const fn side(&self) -> Option<Side> {
        self.command.side()
    }

    /// Returns `true` if this record terminates its batch.
    pub const fn is_end_of_batch(&self) -> bool {
        self.flags.is_end_of_batch()
    }
}
