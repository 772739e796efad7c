//! A crate for rewriting one trading day of Sierra Chart intraday (`.scid`)
//! and market depth (`.depth`) files onto a single strictly monotonic
//! timeline.
//!
//! The rewrite preserves every input trade exactly once, interleaves depth
//! batches and trades deterministically, reconstructs the best bid/offer
//! carried in tick records from the depth book, and injects one marker record
//! per depth batch into the trades output so both files describe the same
//! event sequence. See [`sync::Synchronizer`] for the pairing engine and
//! [`run::run_day`] for the day-level entry point.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(clippy::missing_errors_doc)]

pub mod anomaly;
pub mod batch;
pub mod book;
pub mod decode;
pub mod encode;
pub mod enums;
pub mod error;
pub mod flags;
pub mod hash;
pub mod manifest;
pub mod record;
pub mod run;
pub mod sync;
pub mod timestamp;
pub mod verify;

pub use crate::{
    anomaly::{Anomaly, AnomalyCounts, AnomalyKind, DiagnosticsSink},
    batch::DepthBatch,
    book::Book,
    error::{Error, Result},
    run::{run_day, DirLocator, FileLocator, RunOutcome, RunStatus},
    sync::{SyncCounts, Synchronizer, UnifiedEvent},
};

/// The length in bytes of an intraday file header, preserved verbatim.
pub const INTRADAY_HEADER_LEN: usize = 56;
/// The length in bytes of an intraday record.
pub const INTRADAY_RECORD_LEN: usize = 40;
/// The length in bytes of a depth file header.
pub const DEPTH_HEADER_LEN: usize = 64;
/// The length in bytes of a depth record.
pub const DEPTH_RECORD_LEN: usize = 24;

/// The magic number opening an intraday file header.
pub const INTRADAY_MAGIC: u32 = u32::from_le_bytes(*b"SCID");
/// The magic number opening a depth file header.
pub const DEPTH_MAGIC: u32 = u32::from_le_bytes(*b"SCDD");

/// The `open` bit pattern marking a single trade: `high` carries the ask,
/// `low` the bid, `close` the trade price.
pub const SINGLE_TRADE_BITS: u32 = 0x0000_0000;
/// The `open` bit pattern marking the first sub-trade of an unbundled
/// aggregate (the IEEE-754 bits of `-1.99900095e37`).
pub const FIRST_SUB_TRADE_BITS: u32 = 0xFAE6_E78A;
/// The `open` bit pattern marking the last sub-trade of an unbundled
/// aggregate (the IEEE-754 bits of `-1.99900197e37`).
pub const LAST_SUB_TRADE_BITS: u32 = 0xFAE6_E84E;
/// The `open` bit pattern of records injected into the trades output for
/// each depth batch: a quiet NaN, distinct from every sentinel above. The
/// choice is published in each run's manifest.
pub const INJECTED_TICK_BITS: u32 = 0x7FC0_DEAD;

/// Sub-millisecond slots available within one millisecond bucket.
pub const SLOTS_PER_MS: u32 = 1_000;
