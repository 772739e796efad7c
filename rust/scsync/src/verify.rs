//! End-of-run verification of the rewritten pair.
//!
//! The verifier re-reads the two produced files with the same decoders used
//! on the inputs, merges them back onto one timeline, and checks the
//! properties a correct rewrite must have. It also recomputes the rolling
//! checksum, which must equal the one the synchronizer reported.

use std::collections::HashMap;
use std::path::Path;

use crate::{
    batch::DepthBatch,
    book::Book,
    decode::{Decode, DepthDecoder, IntradayDecoder},
    enums::Side,
    error::Result,
    hash::EventHasher,
    record::IntradayRecord,
    timestamp::{self, MsIndex, UnixNanos},
};

/// What the rewritten pair is expected to contain, taken from the
/// synchronizer's input-side counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Expectations {
    /// Intraday records decoded from the input.
    pub trades_in: u64,
    /// Depth records decoded from the input.
    pub depth_records_in: u64,
    /// Depth batches decoded from the input.
    pub depth_batches_in: u64,
    /// Volume mismatches the crosscheck tolerates: the trades the run already
    /// reported as not exactly accounted for.
    pub flagged_trades: u64,
}

/// The verifier's findings over one rewritten pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyReport {
    /// Intraday records found in the trades output.
    pub trades_out: u64,
    /// Depth records found in the depth output.
    pub depth_records_out: u64,
    /// Depth batches found in the depth output.
    pub depth_batches_out: u64,
    /// `depth_records_out` equals the input count and `trades_out` equals
    /// input trades plus input batches.
    pub counts_match: bool,
    /// Every merged event carries a strictly greater timestamp than its
    /// predecessor.
    pub strictly_monotonic: bool,
    /// Every depth record's reserved field is zero.
    pub reserved_zero: bool,
    /// Trades whose volume no batch in their millisecond accounts for.
    pub volume_mismatches: u64,
    /// `volume_mismatches` stayed within the flagged tolerance.
    pub volume_check: bool,
    /// The recomputed rolling checksum over the merged sequence.
    pub manifest_hash: u64,
}

impl VerifyReport {
    /// Returns `true` when every check passed.
    pub fn passed(&self) -> bool {
        self.counts_match && self.strictly_monotonic && self.reserved_zero && self.volume_check
    }
}

/// Re-reads a rewritten pair from disk and verifies it against
/// `expectations`.
///
/// # Errors
/// This function returns an error if either output cannot be opened or
/// decoded; the produced files must always be structurally valid.
pub fn check(
    trades_path: impl AsRef<Path>,
    depth_path: impl AsRef<Path>,
    expectations: &Expectations,
) -> Result<VerifyReport> {
    let trades = IntradayDecoder::from_file(trades_path)?.decode_all()?;
    let batches = DepthDecoder::from_file(depth_path)?.decode_all()?;
    Ok(check_decoded(&trades, &batches, expectations))
}

/// Verifies an already decoded rewritten pair against `expectations`.
pub fn check_decoded(
    trades: &[IntradayRecord],
    batches: &[DepthBatch],
    expectations: &Expectations,
) -> VerifyReport {
    let depth_records_out: u64 = batches.iter().map(|b| b.records().len() as u64).sum();
    let trades_out = trades.len() as u64;
    let counts_match = depth_records_out == expectations.depth_records_in
        && trades_out == expectations.trades_in + expectations.depth_batches_in;

    let mut merged = MergeWalk::new(trades, batches);
    let mut hasher = EventHasher::new();
    let mut strictly_monotonic = true;
    let mut reserved_zero = true;
    let mut last_ns: Option<UnixNanos> = None;
    let mut crosscheck = VolumeCrosscheck::default();
    while let Some(event) = merged.next() {
        let ns = event.ns();
        if last_ns.is_some_and(|last| ns <= last) {
            strictly_monotonic = false;
        }
        last_ns = Some(ns);
        match event {
            Merged::Batch(batch) => {
                for record in batch.records() {
                    if record.reserved != 0 {
                        reserved_zero = false;
                    }
                    hasher.update_depth(record);
                }
                crosscheck.absorb_batch(batch);
            }
            Merged::Tick(record) => {
                hasher.update_tick(record);
                crosscheck.absorb_tick(record);
            }
        }
    }

    let volume_mismatches = crosscheck.mismatches;
    VerifyReport {
        trades_out,
        depth_records_out,
        depth_batches_out: batches.len() as u64,
        counts_match,
        strictly_monotonic,
        reserved_zero,
        volume_mismatches,
        volume_check: volume_mismatches <= expectations.flagged_trades,
        manifest_hash: hasher.digest(),
    }
}

enum Merged<'a> {
    Batch(&'a DepthBatch),
    Tick(&'a IntradayRecord),
}

impl Merged<'_> {
    fn ns(&self) -> UnixNanos {
        match self {
            Merged::Batch(batch) => timestamp::from_sc_us(batch.sc_us()),
            Merged::Tick(record) => timestamp::from_sc_us(record.sc_us),
        }
    }
}

/// A two-pointer merge over the rewritten pair, in timestamp order with depth
/// winning ties. Slot assignment makes ties impossible outside the packed
/// overflow case.
struct MergeWalk<'a> {
    trades: &'a [IntradayRecord],
    batches: &'a [DepthBatch],
    trade_idx: usize,
    batch_idx: usize,
}

impl<'a> MergeWalk<'a> {
    fn new(trades: &'a [IntradayRecord], batches: &'a [DepthBatch]) -> Self {
        Self {
            trades,
            batches,
            trade_idx: 0,
            batch_idx: 0,
        }
    }

    fn next(&mut self) -> Option<Merged<'a>> {
        let trade = self.trades.get(self.trade_idx);
        let batch = self.batches.get(self.batch_idx);
        match (trade, batch) {
            (None, None) => None,
            (Some(trade), None) => {
                self.trade_idx += 1;
                Some(Merged::Tick(trade))
            }
            (None, Some(batch)) => {
                self.batch_idx += 1;
                Some(Merged::Batch(batch))
            }
            (Some(trade), Some(batch)) => {
                if timestamp::from_sc_us(batch.sc_us()) <= timestamp::from_sc_us(trade.sc_us) {
                    self.batch_idx += 1;
                    Some(Merged::Batch(batch))
                } else {
                    self.trade_idx += 1;
                    Some(Merged::Tick(trade))
                }
            }
        }
    }
}

/// Replays the depth output through a fresh book and checks that every
/// trade's volume is accounted for by some batch of its millisecond.
#[derive(Default)]
struct VolumeCrosscheck {
    book: Book,
    current_ms: Option<MsIndex>,
    /// Net quantity removed per `(side, price bits)`, one map per batch of
    /// the current millisecond.
    removals: Vec<HashMap<(Side, u32), i64>>,
    mismatches: u64,
}

impl VolumeCrosscheck {
    fn roll_to(&mut self, ms: MsIndex) {
        if self.current_ms != Some(ms) {
            self.current_ms = Some(ms);
            self.removals.clear();
        }
    }

    fn absorb_batch(&mut self, batch: &DepthBatch) {
        self.roll_to(batch.ms());
        let mut removed: HashMap<(Side, u32), i64> = HashMap::new();
        for record in batch.records() {
            if let Some(side) = record.side() {
                if record.command.is_modify() || record.command.is_delete() {
                    let prev = self
                        .book
                        .depth_of(side, record.price)
                        .map_or(0, |level| level.quantity);
                    let next = if record.command.is_delete() {
                        0
                    } else {
                        record.quantity
                    };
                    *removed.entry((side, record.price.to_bits())).or_default() +=
                        i64::from(prev) - i64::from(next);
                }
            }
            self.book.apply(record);
        }
        self.removals.push(removed);
    }

    fn absorb_tick(&mut self, record: &IntradayRecord) {
        if record.is_injected() || !record.tick_class().is_trade() {
            return;
        }
        let ms = timestamp::ms_of(timestamp::from_sc_us(record.sc_us));
        self.roll_to(ms);
        if self.removals.is_empty() {
            // an orphan bucket: no batch to check against
            return;
        }
        let price_bits = record.close.to_bits();
        let volume = i64::from(record.total_volume);
        let accounted = self.removals.iter().any(|removed| {
            removed.get(&(Side::Ask, price_bits)) == Some(&volume)
                || removed.get(&(Side::Bid, price_bits)) == Some(&volume)
        });
        if !accounted {
            self.mismatches += 1;
        }
    }
}
