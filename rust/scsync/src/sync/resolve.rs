//! Trade-to-batch resolution within one millisecond bucket.

use crate::{
    anomaly::AnomalyKind,
    batch::DepthBatch,
    book::Book,
    enums::Side,
    record::IntradayRecord,
};

/// The outcome of resolving one bucket.
pub(crate) struct Resolution {
    /// The batch index per trade, parallel to the bucket's trades.
    pub assignments: Vec<usize>,
    /// Trades whose chosen batch did not exactly account for their volume.
    /// The end-of-run volume crosscheck tolerates this many mismatches.
    pub unmatched: u64,
}

/// Attaches each trade of a bucket to one of the bucket's depth batches,
/// walking trades in file order. `on_anomaly` is called for every trade that
/// fell through to the attach-to-last-batch fallback.
///
/// `book` is the live book as of the start of the bucket; it is only cloned
/// here, never mutated.
pub(crate) fn resolve_bucket(
    book: &Book,
    batches: &[DepthBatch],
    trades: &[IntradayRecord],
    mut on_anomaly: impl FnMut(AnomalyKind),
) -> Resolution {
    debug_assert!(!batches.is_empty());
    // states[i] is the book before batch i; states[i + 1] the book after it
    let mut states = Vec::with_capacity(batches.len() + 1);
    let mut current = book.clone();
    states.push(current.clone());
    for batch in batches {
        for record in batch.records() {
            current.apply(record);
        }
        states.push(current.clone());
    }

    let mut assignments: Vec<usize> = Vec::with_capacity(trades.len());
    let mut unmatched = 0;
    let mut consumed = vec![false; batches.len()];
    for trade in trades {
        let idx = if !trade.tick_class().is_trade() {
            // aggregate bars never score; they follow the nearest preceding
            // tick so relative file order survives
            assignments.last().copied().unwrap_or(0)
        } else if batches.len() == 1 {
            // a lone batch takes every trade; scoring still feeds the
            // crosscheck tolerance
            if !exact_match(&states[0], &batches[0], trade, trade.aggressor_side()) {
                unmatched += 1;
            }
            0
        } else {
            let (idx, exact) = resolve_trade(&states, batches, &consumed, trade, &mut on_anomaly);
            if exact {
                consumed[idx] = true;
            } else {
                unmatched += 1;
            }
            idx
        };
        assignments.push(idx);
    }
    Resolution {
        assignments,
        unmatched,
    }
}

fn resolve_trade(
    states: &[Book],
    batches: &[DepthBatch],
    consumed: &[bool],
    trade: &IntradayRecord,
    on_anomaly: &mut impl FnMut(AnomalyKind),
) -> (usize, bool) {
    let side = trade.aggressor_side();
    let mut first_match = None;
    for (idx, batch) in batches.iter().enumerate() {
        if exact_match(&states[idx], batch, trade, side) {
            if !consumed[idx] {
                return (idx, true);
            }
            first_match.get_or_insert(idx);
        }
    }
    if let Some(idx) = first_match {
        return (idx, true);
    }
    // no exact match: a unique batch whose post-apply BBO brackets the price
    let mut bracket = None;
    for idx in 0..batches.len() {
        if brackets(&states[idx + 1], trade.close) {
            if bracket.is_some() {
                bracket = None;
                break;
            }
            bracket = Some(idx);
        }
    }
    match bracket {
        Some(idx) => (idx, false),
        None => {
            on_anomaly(AnomalyKind::UnresolvedTrade);
            (batches.len() - 1, false)
        }
    }
}

fn brackets(book: &Book, price: f32) -> bool {
    match (book.best_bid(), book.best_ask()) {
        (Some(bid), Some(ask)) => bid.price <= price && price <= ask.price,
        _ => false,
    }
}

/// An exact match requires at least one modify or delete touching the trade
/// price on the inferred side, a net removed quantity equal to the trade's
/// volume, and no more touches than the trade has fills.
fn exact_match(
    before: &Book,
    batch: &DepthBatch,
    trade: &IntradayRecord,
    side: Option<Side>,
) -> bool {
    let price_bits = trade.close.to_bits();
    let mut sim = before.clone();
    let mut net_removed: i64 = 0;
    let mut events: u32 = 0;
    for record in batch.records() {
        let record_side = record.side();
        if (record.command.is_modify() || record.command.is_delete())
            && record.price.to_bits() == price_bits
            && (side.is_none() || record_side == side)
        {
            let prev = record_side
                .and_then(|s| sim.depth_of(s, record.price))
                .map_or(0, |level| level.quantity);
            let next = if record.command.is_delete() {
                0
            } else {
                record.quantity
            };
            net_removed += i64::from(prev) - i64::from(next);
            events += 1;
        }
        sim.apply(record);
    }
    events > 0
        && net_removed == i64::from(trade.total_volume)
        && events <= trade.num_trades.max(1)
}
