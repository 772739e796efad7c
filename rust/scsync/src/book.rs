//! An in-memory price-indexed depth book.

use std::collections::BTreeMap;
use std::fmt;

use crate::{anomaly::AnomalyKind, enums::Side, record::DepthRecord};

/// A price with total numeric order, derived from the raw IEEE-754 bits.
/// Positive floats keep their bit order once the sign bit is set; negative
/// floats reverse theirs under complement. Equality is bit equality, which is
/// what the on-disk format gives us anyway.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PriceKey(u32);

impl PriceKey {
    /// Creates a sortable key from a price.
    pub fn new(price: f32) -> Self {
        let bits = price.to_bits();
        Self(if bits & 0x8000_0000 == 0 {
            bits | 0x8000_0000
        } else {
            !bits
        })
    }

    /// Recovers the price.
    pub fn price(&self) -> f32 {
        f32::from_bits(if self.0 & 0x8000_0000 != 0 {
            self.0 & !0x8000_0000
        } else {
            !self.0
        })
    }
}

impl fmt::Debug for PriceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PriceKey({})", self.price())
    }
}

/// The aggregate state of one price level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Level {
    /// The number of orders resting at the price.
    pub num_orders: u16,
    /// The quantity resting at the price.
    pub quantity: u32,
}

/// One side of the top of book.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quote {
    /// The level's price.
    pub price: f32,
    /// The quantity resting at the price.
    pub quantity: u32,
    /// The number of orders resting at the price.
    pub num_orders: u16,
}

/// A pair of price-keyed level maps maintained by applying depth records.
/// Iteration order is defined (ascending price) on both sides, which keeps
/// every downstream consumer deterministic.
#[derive(Debug, Clone, Default)]
pub struct Book {
    bids: BTreeMap<PriceKey, Level>,
    asks: BTreeMap<PriceKey, Level>,
}

impl Book {
    /// Empties both sides.
    pub fn clear(&mut self) {
        self.bids.clear();
        self.asks.clear();
    }

    /// Applies one depth record, repairing heuristically where the record
    /// contradicts the book: an add over an existing price is applied as a
    /// modify, a modify at an absent price inserts, a delete at an absent
    /// price is ignored, and a zero quantity removes the level. Returns the
    /// anomaly kind when a repair happened.
    pub fn apply(&mut self, record: &DepthRecord) -> Option<AnomalyKind> {
        let Some(side) = record.side() else {
            self.clear();
            return None;
        };
        let key = PriceKey::new(record.price);
        let level = Level {
            num_orders: record.num_orders,
            quantity: record.quantity,
        };
        let map = self.side_mut(side);
        if record.command.is_delete() {
            if map.remove(&key).is_none() {
                Some(AnomalyKind::DeleteMissing)
            } else {
                None
            }
        } else if record.quantity == 0 {
            map.remove(&key);
            Some(AnomalyKind::NegativeOrZeroQuantity)
        } else if record.command.is_add() {
            if map.insert(key, level).is_some() {
                Some(AnomalyKind::AddOverExisting)
            } else {
                None
            }
        } else if map.insert(key, level).is_none() {
            Some(AnomalyKind::ModifyMissing)
        } else {
            None
        }
    }

    /// The highest bid, if the bid side is non-empty.
    pub fn best_bid(&self) -> Option<Quote> {
        self.bids.iter().next_back().map(Self::quote)
    }

    /// The lowest ask, if the ask side is non-empty.
    pub fn best_ask(&self) -> Option<Quote> {
        self.asks.iter().next().map(Self::quote)
    }

    /// The level resting at `price` on `side`.
    pub fn depth_of(&self, side: Side, price: f32) -> Option<Level> {
        self.side(side).get(&PriceKey::new(price)).copied()
    }

    /// Returns `true` when the best bid has reached or crossed the best ask.
    pub fn is_crossed(&self) -> bool {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => bid.price >= ask.price,
            _ => false,
        }
    }

    /// The number of levels on `side`.
    pub fn num_levels(&self, side: Side) -> usize {
        self.side(side).len()
    }

    /// Iterates over `side` best-first: bids descending, asks ascending.
    pub fn levels(&self, side: Side) -> Box<dyn Iterator<Item = (f32, Level)> + '_> {
        let unkey = |(key, level): (&PriceKey, &Level)| (key.price(), *level);
        match side {
            Side::Bid => Box::new(self.bids.iter().rev().map(unkey)),
            Side::Ask => Box::new(self.asks.iter().map(unkey)),
        }
    }

    fn quote((key, level): (&PriceKey, &Level)) -> Quote {
        Quote {
            price: key.price(),
            quantity: level.quantity,
            num_orders: level.num_orders,
        }
    }

    fn side(&self, side: Side) -> &BTreeMap<PriceKey, Level> {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    fn side_mut(&mut self, side: Side) -> &mut BTreeMap<PriceKey, Level> {
        match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        }
    }
}
