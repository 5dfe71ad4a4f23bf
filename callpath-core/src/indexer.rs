//! Candle Indexer (§4.1) — locates the entry candle as the first index `i`
//! with `candles[i].ts_ms >= entry_ts_ms`. Total function: never fails.

use crate::domain::Candle;

/// First index with `ts_ms >= entry_ts_ms`, or `None` if every candle is
/// strictly before it (§4.1). Candles before the first one resolve to
/// index 0, per §8's boundary case.
pub fn find_entry_index(candles: &[Candle], entry_ts_ms: i64) -> Option<usize> {
    // Half-open lower-bound binary search: candles are time-ordered ascending.
    let mut lo = 0usize;
    let mut hi = candles.len();
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if candles[mid].ts_ms < entry_ts_ms {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    if lo < candles.len() {
        Some(lo)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(ts: i64) -> Candle {
        Candle::new(ts, 1.0, 1.0, 1.0, 1.0, 1.0)
    }

    #[test]
    fn finds_exact_match() {
        let candles = vec![candle(0), candle(60_000), candle(120_000)];
        assert_eq!(find_entry_index(&candles, 60_000), Some(1));
    }

    #[test]
    fn finds_first_candle_after_gap() {
        let candles = vec![candle(0), candle(120_000)];
        assert_eq!(find_entry_index(&candles, 60_000), Some(1));
    }

    #[test]
    fn entry_before_first_candle_returns_zero() {
        let candles = vec![candle(1_000), candle(2_000)];
        assert_eq!(find_entry_index(&candles, 0), Some(0));
    }

    #[test]
    fn entry_after_last_candle_returns_none() {
        let candles = vec![candle(0), candle(1_000)];
        assert_eq!(find_entry_index(&candles, 5_000), None);
    }

    #[test]
    fn empty_candles_returns_none() {
        let candles: Vec<Candle> = vec![];
        assert_eq!(find_entry_index(&candles, 0), None);
    }
}
