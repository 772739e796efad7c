//! Non-fatal anomaly reporting.
//!
//! Decoder-level book repairs and matching fallbacks never halt a run; each
//! occurrence is handed to a [`DiagnosticsSink`] and tallied for the end-of-run
//! manifest.

use std::fmt;

use crate::timestamp::UnixNanos;

/// The kinds of non-fatal anomalies a run can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AnomalyKind {
    /// An add command at a price already present; applied as a modify.
    AddOverExisting,
    /// A modify command at an absent price; applied as an add.
    ModifyMissing,
    /// A delete command at an absent price; ignored.
    DeleteMissing,
    /// An add or modify carrying zero quantity; applied as a delete.
    NegativeOrZeroQuantity,
    /// A trade that matched no batch in its bucket and was attached to the
    /// bucket's last batch.
    UnresolvedTrade,
    /// A bucket with trades but no depth batches; an empty batch was
    /// synthesized to host them.
    OrphanTradeBucket,
    /// A bucket needing more than 1000 sub-millisecond slots with no room to
    /// spill; trailing events were packed onto the last slot.
    BucketOverflow,
    /// The book's best bid reached or crossed its best ask after a batch
    /// applied.
    CrossedBook,
}

impl AnomalyKind {
    /// Every anomaly kind, in tally order.
    pub const ALL: [AnomalyKind; 8] = [
        Self::AddOverExisting,
        Self::ModifyMissing,
        Self::DeleteMissing,
        Self::NegativeOrZeroQuantity,
        Self::UnresolvedTrade,
        Self::OrphanTradeBucket,
        Self::BucketOverflow,
        Self::CrossedBook,
    ];

    /// The kind's name as it appears in manifests and logs.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::AddOverExisting => "add_over_existing",
            Self::ModifyMissing => "modify_missing",
            Self::DeleteMissing => "delete_missing",
            Self::NegativeOrZeroQuantity => "negative_or_zero_quantity",
            Self::UnresolvedTrade => "unresolved_trade",
            Self::OrphanTradeBucket => "orphan_trade_bucket",
            Self::BucketOverflow => "bucket_overflow",
            Self::CrossedBook => "crossed_book",
        }
    }
}

/// One anomaly occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anomaly {
    /// What happened.
    pub kind: AnomalyKind,
    /// The event timestamp the anomaly was observed at.
    pub ns: UnixNanos,
}

/// Receives anomaly records as a run produces them.
pub trait DiagnosticsSink {
    /// Called once per anomaly occurrence, in emission order.
    fn record(&mut self, anomaly: Anomaly);
}

/// The default sink: counts occurrences by kind.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AnomalyCounts {
    counts: [u64; AnomalyKind::ALL.len()],
}

impl AnomalyCounts {
    /// The number of occurrences of `kind`.
    pub fn get(&self, kind: AnomalyKind) -> u64 {
        self.counts[kind as usize]
    }

    /// The total number of occurrences across all kinds.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Returns `true` if no anomaly was recorded.
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Iterates over `(kind, count)` pairs with nonzero counts.
    pub fn iter(&self) -> impl Iterator<Item = (AnomalyKind, u64)> + '_ {
        AnomalyKind::ALL
            .into_iter()
            .map(|kind| (kind, self.get(kind)))
            .filter(|(_, count)| *count > 0)
    }
}

impl DiagnosticsSink for AnomalyCounts {
    fn record(&mut self, anomaly: Anomaly) {
        tracing::debug!(kind = anomaly.kind.name(), ns = anomaly.ns, "anomaly");
        self.counts[anomaly.kind as usize] += 1;
    }
}

impl fmt::Display for AnomalyCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "none");
        }
        let mut first = true;
        for (kind, count) in self.iter() {
            if !first {
                write!(f, " ")?;
            }
            write!(f, "{}={count}", kind.name())?;
            first = false;
        }
        Ok(())
    }
}
