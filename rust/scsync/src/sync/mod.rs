//! The pairing engine: consumes decoded intraday records and depth batches in
//! timestamp order, maintains the running book, resolves trades into batches
//! at millisecond granularity, and emits one strictly ordered stream of
//! unified events carrying freshly assigned sub-millisecond timestamps.

mod resolve;

use std::collections::VecDeque;
use std::io;

use crate::{
    anomaly::{Anomaly, AnomalyCounts, AnomalyKind, DiagnosticsSink},
    batch::DepthBatch,
    book::Book,
    decode::{DepthDecoder, IntradayDecoder},
    enums::TickClass,
    error::{Error, Result},
    hash::EventHasher,
    record::IntradayRecord,
    timestamp::{self, MsIndex, UnixNanos},
};

/// One event on the unified timeline. The two rewritten outputs are
/// projections of this sequence: depth batches go to the depth output, ticks
/// and injected markers to the trades output.
#[derive(Debug, Clone, PartialEq)]
pub enum UnifiedEvent {
    /// A depth batch with rewritten timestamps; its records share one
    /// sub-millisecond slot, since a shared timestamp is what defines a batch.
    Depth(DepthBatch),
    /// A rewritten tick, or an aggregate bar passed through.
    Tick(IntradayRecord),
    /// The marker injected into the trades output for one depth batch.
    InjectedTick(IntradayRecord),
}

impl UnifiedEvent {
    /// The event's nanosecond timestamp.
    pub fn ns(&self) -> UnixNanos {
        match self {
            Self::Depth(batch) => timestamp::from_sc_us(batch.sc_us()),
            Self::Tick(record) | Self::InjectedTick(record) => {
                timestamp::from_sc_us(record.sc_us)
            }
        }
    }
}

/// Record counters accumulated over one run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncCounts {
    /// Intraday records decoded from the input.
    pub trades_in: u64,
    /// Depth records decoded from the input.
    pub depth_records_in: u64,
    /// Depth batches decoded from the input.
    pub depth_batches_in: u64,
    /// Intraday records emitted, injected markers included.
    pub trades_out: u64,
    /// Depth records emitted.
    pub depth_records_out: u64,
    /// Injected per-batch markers emitted.
    pub injected: u64,
    /// Millisecond buckets processed.
    pub buckets: u64,
    /// Trades attached to a batch that did not exactly account for their
    /// volume; the verifier's volume crosscheck tolerates this many.
    pub unmatched_trades: u64,
}

/// The synchronizer's phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Constructed; headers validated, no bucket processed yet.
    Init,
    /// Both inputs still have records.
    Streaming,
    /// One input is exhausted; trailing buckets of the other are flushing.
    Draining,
    /// Everything emitted.
    Done,
}

/// The synchronizer. Pull [`next_event`](Self::next_event) until `Ok(None)`.
///
/// For identical inputs the emitted sequence is byte-determined: map
/// iteration orders are defined, every tie-break is fixed, and no internal
/// buffering decision is observable.
pub struct Synchronizer<R1, R2, S = AnomalyCounts> {
    trades: IntradayDecoder<R1>,
    depth: DepthDecoder<R2>,
    sink: S,
    day: Option<(time::Date, (UnixNanos, UnixNanos))>,
    book: Book,
    state: SyncState,
    pending_trade: Option<IntradayRecord>,
    pending_batch: Option<DepthBatch>,
    trades_exhausted: bool,
    depth_exhausted: bool,
    truncated: bool,
    counts: SyncCounts,
    queue: VecDeque<UnifiedEvent>,
    hasher: EventHasher,
    last_ns: Option<UnixNanos>,
}

impl<R1, R2, S> Synchronizer<R1, R2, S>
where
    R1: io::Read,
    R2: io::Read,
    S: DiagnosticsSink,
{
    /// Creates a synchronizer over two decoders whose headers have already
    /// been read and validated. When `day` is given, every depth batch must
    /// fall inside that UTC day.
    pub fn new(
        trades: IntradayDecoder<R1>,
        depth: DepthDecoder<R2>,
        day: Option<time::Date>,
        sink: S,
    ) -> Self {
        Self {
            trades,
            depth,
            sink,
            day: day.map(|d| (d, timestamp::day_bounds(d))),
            book: Book::default(),
            state: SyncState::Init,
            pending_trade: None,
            pending_batch: None,
            trades_exhausted: false,
            depth_exhausted: false,
            truncated: false,
            counts: SyncCounts::default(),
            queue: VecDeque::new(),
            hasher: EventHasher::new(),
            last_ns: None,
        }
    }

    /// Advances to the next unified event. Returns `Ok(None)` once both
    /// inputs are fully consumed and every bucket is flushed.
    ///
    /// # Errors
    /// This function returns an error on structural decode failures, on a
    /// depth record outside the session day, and on a truncation hit before
    /// anything was decoded. A truncation hit later finishes the current
    /// bucket, drops the remainder of both inputs, and marks the run
    /// [`partial`](Self::is_partial) instead of erroring.
    pub fn next_event(&mut self) -> Result<Option<UnifiedEvent>> {
        loop {
            if let Some(event) = self.queue.pop_front() {
                return Ok(Some(event));
            }
            if self.state == SyncState::Done {
                return Ok(None);
            }
            self.advance_bucket()?;
        }
    }

    /// Returns `true` once an input truncation downgraded the run.
    pub fn is_partial(&self) -> bool {
        self.truncated
    }

    /// The synchronizer's phase.
    pub fn state(&self) -> SyncState {
        self.state
    }

    /// The record counters so far.
    pub fn counts(&self) -> SyncCounts {
        self.counts
    }

    /// The rolling checksum over everything emitted so far.
    pub fn digest(&self) -> u64 {
        self.hasher.digest()
    }

    /// The trades-side header, for the rewrite.
    pub fn trades_header(&self) -> &crate::record::IntradayHeader {
        self.trades.header()
    }

    /// The depth-side header, for the rewrite.
    pub fn depth_header(&self) -> &crate::record::DepthHeader {
        self.depth.header()
    }

    /// Returns a reference to the diagnostics sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Consumes the synchronizer and returns the diagnostics sink.
    pub fn into_sink(self) -> S {
        self.sink
    }

    fn anomaly(&mut self, kind: AnomalyKind, ns: UnixNanos) {
        self.sink.record(Anomaly { kind, ns });
    }

    /// Forms and processes the bucket at the smallest pending millisecond.
    fn advance_bucket(&mut self) -> Result<()> {
        if self.state == SyncState::Init {
            self.state = SyncState::Streaming;
        }
        self.fill_trade()?;
        self.fill_batch()?;
        let trade_ms = self
            .pending_trade
            .map(|t| timestamp::ms_of(timestamp::from_sc_us(t.sc_us)));
        let batch_ms = self.pending_batch.as_ref().map(DepthBatch::ms);
        let m = match (trade_ms, batch_ms) {
            (None, None) => {
                self.state = SyncState::Done;
                return Ok(());
            }
            (Some(t), None) => t,
            (None, Some(b)) => b,
            (Some(t), Some(b)) => t.min(b),
        };

        let mut trades = Vec::new();
        while let Some(trade) = self.pending_trade {
            if timestamp::ms_of(timestamp::from_sc_us(trade.sc_us)) != m {
                break;
            }
            trades.push(trade);
            self.pending_trade = None;
            self.fill_trade()?;
        }
        let mut batches = Vec::new();
        while self.pending_batch.as_ref().is_some_and(|b| b.ms() == m) {
            // the take cannot fail: just checked
            if let Some(batch) = self.pending_batch.take() {
                batches.push(batch);
            }
            self.fill_batch()?;
        }

        self.process_bucket(m, trades, batches);
        self.counts.buckets += 1;

        if !self.truncated {
            self.state = match (self.trades_exhausted, self.depth_exhausted) {
                (true, true) if self.pending_trade.is_none() && self.pending_batch.is_none() => {
                    SyncState::Done
                }
                (false, false) => SyncState::Streaming,
                _ => SyncState::Draining,
            };
        } else if self.pending_trade.is_none() && self.pending_batch.is_none() {
            self.state = SyncState::Done;
        } else {
            self.state = SyncState::Draining;
        }
        Ok(())
    }

    fn fill_trade(&mut self) -> Result<()> {
        if self.pending_trade.is_some() || self.trades_exhausted {
            return Ok(());
        }
        match self.trades.decode() {
            Ok(Some(record)) => {
                self.counts.trades_in += 1;
                self.pending_trade = Some(record);
            }
            Ok(None) => self.trades_exhausted = true,
            Err(err) => self.note_truncation(err)?,
        }
        Ok(())
    }

    fn fill_batch(&mut self) -> Result<()> {
        if self.pending_batch.is_some() || self.depth_exhausted {
            return Ok(());
        }
        match self.depth.decode_batch() {
            Ok(Some(batch)) => {
                if let Some((day, (start, end))) = self.day {
                    let ns = timestamp::from_sc_us(batch.sc_us());
                    if ns < start || ns >= end {
                        return Err(Error::OutsideSession {
                            sc_us: batch.sc_us(),
                            day,
                        });
                    }
                }
                self.counts.depth_records_in += batch.records().len() as u64;
                self.counts.depth_batches_in += 1;
                self.pending_batch = Some(batch);
            }
            Ok(None) => self.depth_exhausted = true,
            Err(err) => self.note_truncation(err)?,
        }
        Ok(())
    }

    /// A truncation after at least one decoded record ends both inputs early
    /// and downgrades the run; anything else, or a truncation before any
    /// record, stays fatal.
    fn note_truncation(&mut self, err: Error) -> Result<()> {
        if !err.is_truncation()
            || self.counts.trades_in + self.counts.depth_records_in == 0
        {
            return Err(err);
        }
        tracing::warn!(%err, "input truncated; completing the current bucket and stopping");
        self.truncated = true;
        self.trades_exhausted = true;
        self.depth_exhausted = true;
        Ok(())
    }

    fn process_bucket(
        &mut self,
        m: MsIndex,
        trades: Vec<IntradayRecord>,
        mut batches: Vec<DepthBatch>,
    ) {
        let bucket_ns = timestamp::ns_of_ms(m);
        if batches.is_empty() {
            if trades.is_empty() {
                return;
            }
            self.anomaly(AnomalyKind::OrphanTradeBucket, bucket_ns);
            batches.push(DepthBatch::synthetic(timestamp::to_sc_us(bucket_ns)));
        }

        let book = &self.book;
        let sink = &mut self.sink;
        let resolution = resolve::resolve_bucket(book, &batches, &trades, |kind| {
            sink.record(Anomaly {
                kind,
                ns: bucket_ns,
            })
        });
        self.counts.unmatched_trades += resolution.unmatched;
        let mut trades_by_batch: Vec<Vec<IntradayRecord>> = vec![Vec::new(); batches.len()];
        for (trade, idx) in trades.into_iter().zip(resolution.assignments) {
            trades_by_batch[idx].push(trade);
        }

        // sub-millisecond slots: one per batch, one per injected marker, one
        // per trade, in emission order
        let real_batches = batches.iter().filter(|b| !b.is_synthetic()).count() as u32;
        let trade_slots = trades_by_batch.iter().map(Vec::len).sum::<usize>() as u32;
        let slots_needed = real_batches * 2 + trade_slots;
        let spill = slots_needed > crate::SLOTS_PER_MS && self.neighbor_ms_is_empty(m);
        let mut alloc = SlotAlloc::new(m, spill);

        for (idx, batch) in batches.iter().enumerate() {
            let mut best_bid = 0.0;
            let mut best_ask = 0.0;
            if !batch.is_synthetic() {
                let ns = self.take_slot(&mut alloc, bucket_ns);
                let rewritten = batch.with_sc_us(timestamp::to_sc_us(ns));
                for record in rewritten.records() {
                    if let Some(kind) = self.book.apply(record) {
                        self.anomaly(kind, ns);
                    }
                    self.hasher.update_depth(record);
                }
                if self.book.is_crossed() {
                    self.anomaly(AnomalyKind::CrossedBook, ns);
                }
                self.counts.depth_records_out += rewritten.records().len() as u64;
                self.push(UnifiedEvent::Depth(rewritten));
            }
            if let Some(quote) = self.book.best_bid() {
                best_bid = quote.price;
            }
            if let Some(quote) = self.book.best_ask() {
                best_ask = quote.price;
            }
            if !batch.is_synthetic() {
                let ns = self.take_slot(&mut alloc, bucket_ns);
                let marker = injected_marker(timestamp::to_sc_us(ns), best_ask, best_bid);
                self.hasher.update_tick(&marker);
                self.counts.injected += 1;
                self.counts.trades_out += 1;
                self.push(UnifiedEvent::InjectedTick(marker));
            }
            for mut trade in std::mem::take(&mut trades_by_batch[idx]) {
                let ns = self.take_slot(&mut alloc, bucket_ns);
                trade.sc_us = timestamp::to_sc_us(ns);
                if matches!(
                    trade.tick_class(),
                    TickClass::SingleTrade | TickClass::FirstSubTrade
                ) {
                    trade.high = best_ask;
                    trade.low = best_bid;
                }
                self.hasher.update_tick(&trade);
                self.counts.trades_out += 1;
                self.push(UnifiedEvent::Tick(trade));
            }
        }
    }

    /// `true` when neither stream has records at `m + 1`, so an overfull
    /// bucket may spill there. Lookaheads hold the next occupied millisecond
    /// of each stream because inputs are timestamp-ordered.
    fn neighbor_ms_is_empty(&self, m: MsIndex) -> bool {
        let trade_clear = self.pending_trade.map_or(true, |t| {
            timestamp::ms_of(timestamp::from_sc_us(t.sc_us)) != m + 1
        });
        let batch_clear = self
            .pending_batch
            .as_ref()
            .map_or(true, |b| b.ms() != m + 1);
        trade_clear && batch_clear
    }

    fn take_slot(&mut self, alloc: &mut SlotAlloc, bucket_ns: UnixNanos) -> UnixNanos {
        let (ns, packed) = alloc.take();
        if packed && !alloc.overflow_reported {
            alloc.overflow_reported = true;
            self.anomaly(AnomalyKind::BucketOverflow, bucket_ns);
        }
        ns
    }

    fn push(&mut self, event: UnifiedEvent) {
        debug_assert!(
            self.last_ns.map_or(true, |last| event.ns() >= last),
            "unified timeline went backwards"
        );
        self.last_ns = Some(event.ns());
        self.queue.push_back(event);
    }
}

/// Assigns the sub-millisecond slots of one bucket, spilling into the empty
/// neighbor millisecond when allowed and packing onto the last representable
/// microsecond otherwise (first-come keeps its unique slot).
struct SlotAlloc {
    m: MsIndex,
    next: u32,
    spill: bool,
    overflow_reported: bool,
}

impl SlotAlloc {
    fn new(m: MsIndex, spill: bool) -> Self {
        Self {
            m,
            next: 0,
            spill,
            overflow_reported: false,
        }
    }

    fn take(&mut self) -> (UnixNanos, bool) {
        let slot = self.next;
        self.next += 1;
        if slot < crate::SLOTS_PER_MS {
            (timestamp::compose(self.m, slot), false)
        } else if self.spill && slot < 2 * crate::SLOTS_PER_MS {
            (timestamp::compose(self.m + 1, slot - crate::SLOTS_PER_MS), false)
        } else {
            let m = if self.spill { self.m + 1 } else { self.m };
            (timestamp::compose(m, crate::SLOTS_PER_MS - 1), true)
        }
    }
}

fn injected_marker(sc_us: u64, best_ask: f32, best_bid: f32) -> IntradayRecord {
    IntradayRecord {
        sc_us,
        open_bits: crate::INJECTED_TICK_BITS,
        high: best_ask,
        low: best_bid,
        close: 0.0,
        num_trades: 0,
        total_volume: 0,
        bid_volume: 0,
        ask_volume: 0,
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use crate::{
        encode::{DepthEncoder, IntradayEncoder},
        enums::DepthCommand,
        flags::FlagSet,
        record::{DepthHeader, DepthRecord, IntradayHeader},
    };

    use super::*;

    fn depth_record(sc_us: u64, command: DepthCommand, price: f32, quantity: u32) -> DepthRecord {
        DepthRecord {
            sc_us,
            command,
            flags: FlagSet::empty(),
            num_orders: 1,
            price,
            quantity,
            reserved: 0,
        }
    }

    fn batch(mut records: Vec<DepthRecord>) -> DepthBatch {
        if let Some(last) = records.last_mut() {
            last.flags.set_end_of_batch();
        }
        DepthBatch::from_records(records).unwrap()
    }

    fn single_trade(sc_us: u64, close: f32, volume: u32) -> IntradayRecord {
        IntradayRecord {
            sc_us,
            open_bits: crate::SINGLE_TRADE_BITS,
            high: close,
            low: close - 0.25,
            close,
            num_trades: 1,
            total_volume: volume,
            bid_volume: 0,
            ask_volume: volume,
        }
    }

    fn trades_bytes(records: &[IntradayRecord]) -> Vec<u8> {
        let mut encoder = IntradayEncoder::new(Vec::new(), &IntradayHeader::default()).unwrap();
        encoder.encode_records(records).unwrap();
        encoder.into_inner()
    }

    fn depth_bytes(batches: &[DepthBatch]) -> Vec<u8> {
        let mut encoder = DepthEncoder::new(Vec::new(), &DepthHeader::default()).unwrap();
        for b in batches {
            encoder.encode_batch(b).unwrap();
        }
        encoder.into_inner()
    }

    fn synchronizer(
        trades: Vec<u8>,
        depth: Vec<u8>,
    ) -> Synchronizer<Cursor<Vec<u8>>, Cursor<Vec<u8>>> {
        Synchronizer::new(
            IntradayDecoder::new(Cursor::new(trades)).unwrap(),
            DepthDecoder::new(Cursor::new(depth)).unwrap(),
            None,
            AnomalyCounts::default(),
        )
    }

    fn drain(
        sync: &mut Synchronizer<Cursor<Vec<u8>>, Cursor<Vec<u8>>>,
    ) -> Vec<UnifiedEvent> {
        let mut events = Vec::new();
        while let Some(event) = sync.next_event().unwrap() {
            events.push(event);
        }
        events
    }

    // platform-us base of an arbitrary whole millisecond
    const BASE: u64 = 3_921_059_622_000_000;

    #[test]
    fn depth_only_input_injects_one_marker_per_batch() {
        let batches = vec![
            batch(vec![
                depth_record(BASE, DepthCommand::AddBidLevel, 99.75, 5),
                depth_record(BASE, DepthCommand::AddAskLevel, 100.0, 3),
            ]),
            batch(vec![depth_record(
                BASE + 2_000,
                DepthCommand::ModifyAskLevel,
                100.0,
                2,
            )]),
        ];
        let mut sync = synchronizer(trades_bytes(&[]), depth_bytes(&batches));
        let events = drain(&mut sync);
        assert_eq!(events.len(), 4);
        let UnifiedEvent::InjectedTick(marker) = &events[1] else {
            panic!("expected injected marker, got {:?}", events[1]);
        };
        assert_eq!(marker.open_bits, crate::INJECTED_TICK_BITS);
        assert_eq!(marker.high, 100.0);
        assert_eq!(marker.low, 99.75);
        assert_eq!((marker.num_trades, marker.total_volume), (0, 0));
        let counts = sync.counts();
        assert_eq!(counts.injected, 2);
        assert_eq!(counts.trades_out, 2);
        assert_eq!(counts.depth_records_out, 3);
        assert_eq!(sync.state(), SyncState::Done);
        assert!(!sync.is_partial());
    }

    #[test]
    fn trade_bbo_is_overwritten_after_its_batch_applies() {
        let batches = vec![batch(vec![
            depth_record(BASE, DepthCommand::AddBidLevel, 100.0, 5),
            depth_record(BASE, DepthCommand::AddAskLevel, 100.25, 3),
            depth_record(BASE, DepthCommand::AddAskLevel, 100.5, 9),
            depth_record(BASE, DepthCommand::DeleteAskLevel, 100.25, 0),
        ])];
        let trades = vec![single_trade(BASE + 123, 100.25, 3)];
        let mut sync = synchronizer(trades_bytes(&trades), depth_bytes(&batches));
        let events = drain(&mut sync);
        assert_eq!(events.len(), 3);
        let UnifiedEvent::Tick(tick) = &events[2] else {
            panic!("expected tick, got {:?}", events[2]);
        };
        // best ask fell back to the next level once 100.25 was consumed
        assert_eq!(tick.high, 100.5);
        assert_eq!(tick.low, 100.0);
        assert_eq!(tick.close, 100.25);
        assert_eq!(tick.open_bits, crate::SINGLE_TRADE_BITS);
    }

    #[test]
    fn slots_follow_batch_injected_trade_order() {
        // two batches in one millisecond, trade volume matches the second
        let batches = vec![
            batch(vec![
                depth_record(BASE, DepthCommand::AddBidLevel, 100.75, 5),
                depth_record(BASE, DepthCommand::AddAskLevel, 101.0, 9),
            ]),
            batch(vec![depth_record(
                BASE,
                DepthCommand::ModifyAskLevel,
                101.0,
                6,
            )]),
        ];
        let trades = vec![single_trade(BASE + 7, 101.0, 3)];
        let mut sync = synchronizer(trades_bytes(&trades), depth_bytes(&batches));
        let events = drain(&mut sync);
        let sub_us: Vec<u64> = events.iter().map(|e| e.ns() as u64 % 1_000_000 / 1_000).collect();
        assert_eq!(sub_us, vec![0, 1, 2, 3, 4]);
        assert!(matches!(events[0], UnifiedEvent::Depth(_)));
        assert!(matches!(events[1], UnifiedEvent::InjectedTick(_)));
        assert!(matches!(events[2], UnifiedEvent::Depth(_)));
        assert!(matches!(events[3], UnifiedEvent::InjectedTick(_)));
        assert!(matches!(events[4], UnifiedEvent::Tick(_)));
    }

    #[test]
    fn orphan_trades_ride_a_synthetic_batch() {
        let trades = vec![single_trade(BASE, 100.0, 1), single_trade(BASE + 1, 100.0, 2)];
        let mut sync = synchronizer(trades_bytes(&trades), depth_bytes(&[]));
        let events = drain(&mut sync);
        // no depth events, no injected marker, both trades preserved
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| matches!(e, UnifiedEvent::Tick(_))));
        assert_eq!(sync.counts().injected, 0);
        assert_eq!(sync.sink().get(AnomalyKind::OrphanTradeBucket), 1);
        // empty book at that point writes zeros
        let UnifiedEvent::Tick(tick) = &events[0] else {
            unreachable!()
        };
        assert_eq!((tick.high, tick.low), (0.0, 0.0));
    }

    #[test]
    fn truncated_trades_input_completes_the_bucket_and_stops() {
        let batches = vec![
            batch(vec![depth_record(BASE, DepthCommand::AddAskLevel, 100.0, 3)]),
            batch(vec![depth_record(
                BASE + 10_000,
                DepthCommand::ModifyAskLevel,
                100.0,
                1,
            )]),
        ];
        let mut trades = trades_bytes(&[single_trade(BASE + 3, 100.0, 3)]);
        trades.extend_from_slice(&[0u8; 17]);
        let mut sync = synchronizer(trades, depth_bytes(&batches));
        let events = drain(&mut sync);
        assert!(sync.is_partial());
        assert_eq!(sync.state(), SyncState::Done);
        // first bucket in full; the later depth bucket is dropped
        assert_eq!(events.len(), 3);
        assert_eq!(sync.counts().trades_out, 2);
    }

    #[test]
    fn truncation_before_any_record_is_fatal() {
        let mut sync = synchronizer(vec![0u8; 70], depth_bytes(&[]));
        let err = sync.next_event().unwrap_err();
        assert!(err.is_truncation());
    }

    #[test]
    fn aggregate_bars_pass_through_with_fields_intact() {
        let batches = vec![batch(vec![depth_record(
            BASE,
            DepthCommand::AddAskLevel,
            100.0,
            3,
        )])];
        let bar = IntradayRecord {
            sc_us: BASE + 500,
            open_bits: 99.5f32.to_bits(),
            high: 100.5,
            low: 99.25,
            close: 100.0,
            num_trades: 42,
            total_volume: 1_000,
            bid_volume: 400,
            ask_volume: 600,
        };
        let mut sync = synchronizer(trades_bytes(&[bar]), depth_bytes(&batches));
        let events = drain(&mut sync);
        let UnifiedEvent::Tick(out) = &events[2] else {
            panic!("expected tick, got {:?}", events[2]);
        };
        // only the timestamp is reassigned
        assert_eq!(out.open_bits, bar.open_bits);
        assert_eq!((out.high, out.low, out.close), (bar.high, bar.low, bar.close));
        assert_eq!(out.num_trades, 42);
        assert_eq!(out.total_volume, 1_000);
        assert_ne!(out.sc_us, bar.sc_us);
    }

    #[test]
    fn overfull_buckets_spill_into_an_empty_neighbor() {
        let batches = vec![batch(vec![depth_record(
            BASE,
            DepthCommand::AddAskLevel,
            100.0,
            5,
        )])];
        let trades: Vec<IntradayRecord> =
            (0..1_005).map(|_| single_trade(BASE, 100.0, 1)).collect();
        let mut sync = synchronizer(trades_bytes(&trades), depth_bytes(&batches));
        let events = drain(&mut sync);
        assert_eq!(events.len(), 1_007);
        let mut last = i64::MIN;
        for event in &events {
            assert!(event.ns() > last, "timeline must stay strictly increasing");
            last = event.ns();
        }
        assert_eq!(sync.sink().get(AnomalyKind::BucketOverflow), 0);
    }

    #[test]
    fn overfull_buckets_with_an_occupied_neighbor_pack_and_flag() {
        let batches = vec![
            batch(vec![depth_record(BASE, DepthCommand::AddAskLevel, 100.0, 5)]),
            batch(vec![depth_record(
                BASE + 1_000,
                DepthCommand::ModifyAskLevel,
                100.0,
                4,
            )]),
        ];
        let trades: Vec<IntradayRecord> =
            (0..1_005).map(|_| single_trade(BASE, 100.0, 1)).collect();
        let mut sync = synchronizer(trades_bytes(&trades), depth_bytes(&batches));
        let events = drain(&mut sync);
        assert_eq!(sync.sink().get(AnomalyKind::BucketOverflow), 1);
        // first-come keeps its slot; the rest pack onto the last microsecond
        let packed_ns = timestamp::compose(timestamp::ms_of(timestamp::from_sc_us(BASE)), 999);
        assert!(events.iter().filter(|e| e.ns() == packed_ns).count() > 1);
    }

    #[test]
    fn day_guard_rejects_out_of_session_depth() {
        let day = time::macros::date!(2024 - 03 - 15);
        let batches = vec![batch(vec![depth_record(
            BASE,
            DepthCommand::AddAskLevel,
            100.0,
            3,
        )])];
        let mut sync = Synchronizer::new(
            IntradayDecoder::new(Cursor::new(trades_bytes(&[]))).unwrap(),
            DepthDecoder::new(Cursor::new(depth_bytes(&batches))).unwrap(),
            Some(day),
            AnomalyCounts::default(),
        );
        assert!(matches!(
            sync.next_event().unwrap_err(),
            Error::OutsideSession { .. }
        ));
    }
}
