//! Grouping of depth records into batches.

use crate::{
    enums::{DepthCommand, Side},
    error::{Error, Result},
    record::DepthRecord,
    timestamp::{self, MsIndex},
};

/// A maximal run of depth records sharing one platform-microsecond timestamp,
/// terminated by a record with the `END_OF_BATCH` flag. Within a batch every
/// bid-side record precedes every ask-side record; either side may be empty.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthBatch {
    sc_us: u64,
    records: Vec<DepthRecord>,
    synthetic: bool,
}

impl DepthBatch {
    /// Creates a batch from the records of one terminated run, validating the
    /// batch structure rules.
    ///
    /// # Errors
    /// This function returns [`Error::BadArgument`] if `records` is empty and
    /// [`Error::MalformedBatch`] if the records do not share one timestamp or
    /// a bid-side record follows an ask-side record.
    pub fn from_records(records: Vec<DepthRecord>) -> Result<Self> {
        let Some(first) = records.first() else {
            return Err(Error::bad_argument("records", "none provided"));
        };
        let sc_us = first.sc_us;
        if records.iter().any(|r| r.sc_us != sc_us) {
            return Err(Error::MalformedBatch {
                sc_us,
                desc: "timestamp changed before END_OF_BATCH".to_owned(),
            });
        }
        let mut seen_ask = false;
        for record in &records {
            match record.side() {
                Some(Side::Ask) => seen_ask = true,
                Some(Side::Bid) if seen_ask => {
                    return Err(Error::MalformedBatch {
                        sc_us,
                        desc: "bid-side record follows an ask-side record".to_owned(),
                    });
                }
                _ => {}
            }
        }
        Ok(Self {
            sc_us,
            records,
            synthetic: false,
        })
    }

    /// Creates the empty batch synthesized to host the trades of a bucket
    /// with no depth activity. It contributes no records to the depth output
    /// and no injected record to the trades output.
    pub fn synthetic(sc_us: u64) -> Self {
        Self {
            sc_us,
            records: Vec::new(),
            synthetic: true,
        }
    }

    /// The batch timestamp in platform microseconds.
    pub fn sc_us(&self) -> u64 {
        self.sc_us
    }

    /// The millisecond grid index the batch falls in.
    pub fn ms(&self) -> MsIndex {
        timestamp::ms_of(timestamp::from_sc_us(self.sc_us))
    }

    /// The records of the batch, in file order.
    pub fn records(&self) -> &[DepthRecord] {
        &self.records
    }

    /// Returns `true` for a synthesized empty batch.
    pub fn is_synthetic(&self) -> bool {
        self.synthetic
    }

    /// Returns `true` if the batch starts with a book clear, i.e. it carries
    /// a full snapshot of the book.
    pub fn is_snapshot(&self) -> bool {
        self.records
            .first()
            .is_some_and(|r| r.command == DepthCommand::ClearBook)
    }

    /// Rewrites every record's timestamp, preserving all other fields.
    pub(crate) fn with_sc_us(&self, sc_us: u64) -> Self {
        let mut records = self.records.clone();
        for record in &mut records {
            record.sc_us = sc_us;
        }
        Self {
            sc_us,
            records,
            synthetic: self.synthetic,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::flags::FlagSet;

    use super::*;

    fn record(sc_us: u64, command: DepthCommand, price: f32, end: bool) -> DepthRecord {
        DepthRecord {
            sc_us,
            command,
            flags: if end {
                FlagSet::empty().set_end_of_batch()
            } else {
                FlagSet::empty()
            },
            num_orders: 1,
            price,
            quantity: 10,
            reserved: 0,
        }
    }

    #[test]
    fn snapshot_batches_are_detected() {
        let batch = DepthBatch::from_records(vec![
            record(7, DepthCommand::ClearBook, 0.0, false),
            record(7, DepthCommand::AddBidLevel, 99.75, false),
            record(7, DepthCommand::AddAskLevel, 100.0, true),
        ])
        .unwrap();
        assert!(batch.is_snapshot());
        assert_eq!(batch.sc_us(), 7);
        assert_eq!(batch.records().len(), 3);
    }

    #[test]
    fn bid_after_ask_is_malformed() {
        let err = DepthBatch::from_records(vec![
            record(7, DepthCommand::AddAskLevel, 100.0, false),
            record(7, DepthCommand::AddBidLevel, 99.75, true),
        ])
        .unwrap_err();
        assert!(matches!(err, Error::MalformedBatch { sc_us: 7, .. }));
    }

    #[test]
    fn clear_between_sides_is_allowed() {
        assert!(DepthBatch::from_records(vec![
            record(7, DepthCommand::AddBidLevel, 99.75, false),
            record(7, DepthCommand::ClearBook, 0.0, false),
            record(7, DepthCommand::AddAskLevel, 100.0, true),
        ])
        .is_ok());
    }

    #[test]
    fn mixed_timestamps_are_malformed() {
        let err = DepthBatch::from_records(vec![
            record(7, DepthCommand::AddBidLevel, 99.75, false),
            record(8, DepthCommand::AddAskLevel, 100.0, true),
        ])
        .unwrap_err();
        assert!(matches!(err, Error::MalformedBatch { .. }));
    }

    #[test]
    fn rewriting_timestamps_preserves_everything_else() {
        let batch = DepthBatch::from_records(vec![
            record(7, DepthCommand::AddBidLevel, 99.75, false),
            record(7, DepthCommand::AddAskLevel, 100.0, true),
        ])
        .unwrap();
        let rewritten = batch.with_sc_us(1_234);
        assert_eq!(rewritten.sc_us(), 1_234);
        assert!(rewritten.records().iter().all(|r| r.sc_us == 1_234));
        assert_eq!(rewritten.records()[1].price, 100.0);
        assert!(rewritten.records()[1].is_end_of_batch());
    }
}
