//! Conversions between the platform's 1899-epoch microsecond clock, the
//! internal nanosecond timeline, and the millisecond grid that depth batches
//! align on.
//!
//! Everything here is UTC; timezone handling belongs to callers. The
//! sub-millisecond digits of an intraday timestamp are a sequence counter, not
//! physical time, so the millisecond grid is the only part of the platform
//! clock with intrinsic meaning below one second.

use time::OffsetDateTime;

/// Nanoseconds since the Unix epoch, the internal timeline.
pub type UnixNanos = i64;
/// Microseconds since 1899-12-30 00:00:00 UTC, the on-disk clock.
pub type ScMicros = u64;
/// An index on the internal millisecond grid.
pub type MsIndex = i64;

/// Days between the platform epoch (1899-12-30) and the Unix epoch.
const SC_EPOCH_OFFSET_DAYS: i64 = 25_569;
/// Seconds between the platform epoch and the Unix epoch.
pub const SC_EPOCH_OFFSET_SECS: i64 = SC_EPOCH_OFFSET_DAYS * 86_400;
const SC_EPOCH_OFFSET_US: i64 = SC_EPOCH_OFFSET_SECS * 1_000_000;

const NS_PER_US: i64 = 1_000;
const NS_PER_MS: i64 = 1_000_000;
const NS_PER_DAY: i64 = 86_400_000_000_000;

/// Converts a platform-microsecond timestamp to the internal nanosecond
/// timeline.
pub const fn from_sc_us(sc_us: ScMicros) -> UnixNanos {
    (sc_us as i64 - SC_EPOCH_OFFSET_US) * NS_PER_US
}

/// Converts an internal nanosecond timestamp back to platform microseconds.
/// Sub-microsecond digits are dropped.
pub const fn to_sc_us(ns: UnixNanos) -> ScMicros {
    (ns.div_euclid(NS_PER_US) + SC_EPOCH_OFFSET_US) as ScMicros
}

/// Returns the millisecond grid index containing `ns`.
pub const fn ms_of(ns: UnixNanos) -> MsIndex {
    ns.div_euclid(NS_PER_MS)
}

/// Returns the nanosecond timestamp of the millisecond boundary at `ms`.
pub const fn ns_of_ms(ms: MsIndex) -> UnixNanos {
    ms * NS_PER_MS
}

/// Composes a nanosecond timestamp from a millisecond index and a
/// sub-millisecond slot, mapped into the low microseconds of the platform
/// encoding. `sub_us` must be in `[0, 999]`.
pub const fn compose(ms: MsIndex, sub_us: u32) -> UnixNanos {
    debug_assert!(sub_us < 1_000);
    ns_of_ms(ms) + sub_us as i64 * NS_PER_US
}

/// Returns the `[start, end)` nanosecond bounds of the UTC day `day`.
pub fn day_bounds(day: time::Date) -> (UnixNanos, UnixNanos) {
    let start = day.midnight().assume_utc().unix_timestamp_nanos() as i64;
    (start, start + NS_PER_DAY)
}

/// Converts an internal nanosecond timestamp to a datetime, for diagnostics.
pub fn ns_to_dt(ns: UnixNanos) -> OffsetDateTime {
    // constructing from i128 nanos cannot fail within the i64 range
    OffsetDateTime::from_unix_timestamp_nanos(ns as i128).unwrap()
}

#[cfg(test)]
mod tests {
    use rstest::*;
    use time::macros::datetime;

    use super::*;

    #[test]
    fn epoch_offset() {
        assert_eq!(from_sc_us(SC_EPOCH_OFFSET_US as u64), 0);
        assert_eq!(
            ns_to_dt(from_sc_us(SC_EPOCH_OFFSET_US as u64)),
            datetime!(1970-01-01 00:00 UTC)
        );
    }

    #[rstest]
    #[case::epoch(0)]
    #[case::one_us(1)]
    #[case::modern(3_921_059_622_000_123)]
    #[case::ms_boundary(3_921_059_622_000_000)]
    fn round_trip_at_us_resolution(#[case] sc_us: ScMicros) {
        assert_eq!(to_sc_us(from_sc_us(sc_us)), sc_us);
    }

    #[rstest]
    #[case(0, 0, 0)]
    #[case(1_000, 0, 1_000_000_000)]
    #[case(1_000, 999, 1_000_999_000)]
    fn compose_and_project(#[case] ms: MsIndex, #[case] sub_us: u32, #[case] exp_ns: UnixNanos) {
        let ns = compose(ms, sub_us);
        assert_eq!(ns, exp_ns);
        assert_eq!(ms_of(ns), ms);
    }

    #[test]
    fn day_bounds_cover_exactly_one_day() {
        let day = time::macros::date!(2024 - 03 - 15);
        let (start, end) = day_bounds(day);
        assert_eq!(ns_to_dt(start), datetime!(2024-03-15 00:00 UTC));
        assert_eq!(end - start, NS_PER_DAY);
        let sc_us = to_sc_us(start);
        assert_eq!(from_sc_us(sc_us), start);
    }

    #[test]
    fn pre_unix_timestamps_project_consistently() {
        // the platform epoch itself lands on a negative nanosecond timestamp
        let ns = from_sc_us(0);
        assert!(ns < 0);
        assert_eq!(ns_of_ms(ms_of(ns)), ns);
        assert_eq!(to_sc_us(ns), 0);
    }
}
