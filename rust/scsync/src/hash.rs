//! The rolling manifest checksum.
//!
//! A streaming XXH64 over `(nanosecond timestamp, kind, key fields)` of every
//! record in emitted order. The synchronizer folds events in as it emits them
//! and the verifier recomputes the same digest from the rewritten files
//! alone, so the two must feed identical bytes.

use xxhash_rust::xxh64::Xxh64;

use crate::{
    record::{DepthRecord, IntradayRecord},
    timestamp::{self, UnixNanos},
};

const KIND_TICK: u8 = 1;
const KIND_DEPTH: u8 = 2;

/// Accumulates the rolling checksum reported in the run manifest.
#[derive(Clone)]
pub struct EventHasher(Xxh64);

impl EventHasher {
    /// Creates an empty hasher.
    pub fn new() -> Self {
        Self(Xxh64::new(0))
    }

    /// Folds in one record of the rewritten trades stream, injected markers
    /// included.
    pub fn update_tick(&mut self, record: &IntradayRecord) {
        let ns = timestamp::from_sc_us(record.sc_us);
        self.push(ns, KIND_TICK);
        self.0.update(&record.open_bits.to_le_bytes());
        self.0.update(&record.close.to_bits().to_le_bytes());
        self.0.update(&record.total_volume.to_le_bytes());
    }

    /// Folds in one record of the rewritten depth stream.
    pub fn update_depth(&mut self, record: &DepthRecord) {
        let ns = timestamp::from_sc_us(record.sc_us);
        self.push(ns, KIND_DEPTH);
        self.0.update(&[u8::from(record.command)]);
        self.0.update(&record.price.to_bits().to_le_bytes());
        self.0.update(&record.quantity.to_le_bytes());
    }

    /// The digest over everything folded in so far.
    pub fn digest(&self) -> u64 {
        self.0.digest()
    }

    fn push(&mut self, ns: UnixNanos, kind: u8) {
        self.0.update(&ns.to_le_bytes());
        self.0.update(&[kind]);
    }
}

impl Default for EventHasher {
    fn default() -> Self {
        Self::new()
    }
}
