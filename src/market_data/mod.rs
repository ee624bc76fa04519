// =============================================================================
// Market Data — candle model and closed-candle filtering
// =============================================================================

use serde::{Deserialize, Serialize};

/// A single OHLCV candle from the Binance klines endpoint.
///
/// Timestamps are epoch milliseconds; candles arrive in ascending
/// close-time order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub close_time: i64,
}

impl Candle {
    pub fn new(
        open_time: i64,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
        close_time: i64,
    ) -> Self {
        Self {
            open_time,
            open,
            high,
            low,
            close,
            volume,
            close_time,
        }
    }
}

/// Keep only candles whose close time is at or before `now_ms`.
///
/// The last kline returned by Binance is usually still in progress; its
/// close price is not final, and feeding it to the indicator would corrupt
/// the RSI and could produce a spurious or missed crossing. Order is
/// preserved.
pub fn closed_candles(candles: Vec<Candle>, now_ms: i64) -> Vec<Candle> {
    candles
        .into_iter()
        .filter(|c| c.close_time <= now_ms)
        .collect()
}
