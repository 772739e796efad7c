//! Enums shared across the intraday and depth codecs.

use std::fmt::{self, Display, Formatter};

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// A side of the depth book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// The buy side.
    Bid,
    /// The sell side.
    Ask,
}

impl Display for Side {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Side::Bid => write!(f, "bid"),
            Side::Ask => write!(f, "ask"),
        }
    }
}

/// A book operation carried by a depth record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum DepthCommand {
    /// Empty both sides of the book. The leading record of a snapshot batch.
    ClearBook = 1,
    /// Insert a price level on the bid side.
    AddBidLevel = 2,
    /// Insert a price level on the ask side.
    AddAskLevel = 3,
    /// Overwrite an existing bid level.
    ModifyBidLevel = 4,
    /// Overwrite an existing ask level.
    ModifyAskLevel = 5,
    /// Remove a bid level.
    DeleteBidLevel = 6,
    /// Remove an ask level.
    DeleteAskLevel = 7,
}

impl DepthCommand {
    /// Returns the side the command operates on, or `None` for
    /// [`Self::ClearBook`].
    pub const fn side(&self) -> Option<Side> {
        match self {
            Self::ClearBook => None,
            Self::AddBidLevel | Self::ModifyBidLevel | Self::DeleteBidLevel => Some(Side::Bid),
            Self::AddAskLevel | Self::ModifyAskLevel | Self::DeleteAskLevel => Some(Side::Ask),
        }
    }

    /// Returns `true` if the command adds a level.
    pub const fn is_add(&self) -> bool {
        matches!(self, Self::AddBidLevel | Self::AddAskLevel)
    }

    /// Returns `true` if the command overwrites a level.
    pub const fn is_modify(&self) -> bool {
        matches!(self, Self::ModifyBidLevel | Self::ModifyAskLevel)
    }

    /// Returns `true` if the command removes a level.
    pub const fn is_delete(&self) -> bool {
        matches!(self, Self::DeleteBidLevel | Self::DeleteAskLevel)
    }
}

/// Classification of an intraday record by the bit pattern of its `open`
/// field. Sentinels are compared bitwise: two of them differ only in low
/// mantissa bits and the injected marker is a NaN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TickClass {
    /// One trade; `high` carries the ask, `low` the bid, and `close` the
    /// trade price.
    SingleTrade,
    /// The first sub-trade of an unbundled aggregate execution.
    FirstSubTrade,
    /// The last sub-trade of an unbundled aggregate execution.
    LastSubTrade,
    /// An OHLCV interval record, passed through unchanged.
    Aggregated,
}

impl TickClass {
    /// Classifies the raw bits of an `open` field.
    pub const fn from_open_bits(bits: u32) -> Self {
        match bits {
            crate::SINGLE_TRADE_BITS => Self::SingleTrade,
            crate::FIRST_SUB_TRADE_BITS => Self::FirstSubTrade,
            crate::LAST_SUB_TRADE_BITS => Self::LastSubTrade,
            _ => Self::Aggregated,
        }
    }

    /// Returns `true` for the three tick classes that represent an execution,
    /// as opposed to an aggregated interval bar.
    pub const fn is_trade(&self) -> bool {
        !matches!(self, Self::Aggregated)
    }
}
