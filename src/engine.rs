// =============================================================================
// Alert Engine — the poll cycle
// =============================================================================
//
// One cycle: for each configured symbol, fetch recent klines, drop the
// in-progress candle, compute the current RSI and the RSI one candle back,
// run the crossing detector, and dispatch one message per event. After all
// symbols the full dedup snapshot is persisted once.
//
// A symbol that fails to fetch or parse is logged and skipped; the rest of
// the cycle proceeds, and the loop itself never terminates because of a
// processing error.
// =============================================================================

use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, error, info};

use crate::binance::BinanceClient;
use crate::config::{Config, KLINE_FETCH_LIMIT};
use crate::detector::{evaluate, AlertEvent, Thresholds};
use crate::indicators::rsi::compute_rsi;
use crate::market_data::closed_candles;
use crate::notify::{dispatch, Notifier};
use crate::state::{AlertState, SymbolState};

pub struct AlertEngine {
    config: Config,
    client: BinanceClient,
    notifiers: Vec<Box<dyn Notifier>>,
}

impl AlertEngine {
    pub fn new(config: Config, client: BinanceClient, notifiers: Vec<Box<dyn Notifier>>) -> Self {
        Self {
            config,
            client,
            notifiers,
        }
    }

    /// Run until externally terminated, or exactly one cycle in one-shot
    /// mode. Both modes share the same per-cycle logic.
    pub async fn run(&self, state: &mut AlertState, once: bool) {
        loop {
            self.run_cycle(state).await;

            if once {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_secs(self.config.check_every_seconds))
                .await;
        }
    }

    /// One full pass over the configured symbols, in configured order,
    /// followed by a single state save.
    pub async fn run_cycle(&self, state: &mut AlertState) {
        for symbol in &self.config.symbols {
            if let Err(e) = self.check_symbol(symbol, state).await {
                error!(symbol = %symbol, error = %e, "symbol check failed");
            }
        }

        if let Err(e) = state.save(&self.config.state_file) {
            // Not fatal: the next successful save rewrites the full mapping,
            // and a lost write can only cause a duplicate alert.
            error!(error = %e, "failed to persist alert state");
        }
    }

    async fn check_symbol(&self, symbol: &str, state: &mut AlertState) -> anyhow::Result<()> {
        let candles = self
            .client
            .get_klines(symbol, &self.config.interval, KLINE_FETCH_LIMIT)
            .await?;

        let candles = closed_candles(candles, now_ms());
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let last_close_time = match candles.last() {
            Some(c) => c.close_time,
            None => return Ok(()),
        };

        let thresholds = Thresholds {
            oversold: self.config.oversold,
            overbought: self.config.overbought,
        };

        let events = evaluate_series(
            symbol,
            &closes,
            last_close_time,
            self.config.rsi_period,
            thresholds,
            state.entry(symbol),
        );

        for event in &events {
            let message = format_alert(event, &self.config.interval);
            info!(symbol = %event.symbol, direction = %event.direction, rsi = event.rsi, "ALERT");
            dispatch(&self.notifiers, &message).await;
        }

        Ok(())
    }
}

/// Evaluate one symbol's close series for crossings.
///
/// Needs `period + 2` closes: the current RSI consumes `period + 1`, and
/// the previous RSI is computed by dropping the most recent close, which
/// takes one more. A shorter window is a silent skip, not an error.
pub fn evaluate_series(
    symbol: &str,
    closes: &[f64],
    last_close_time: i64,
    period: usize,
    thresholds: Thresholds,
    symbol_state: &mut SymbolState,
) -> Vec<AlertEvent> {
    if closes.len() < period + 2 {
        debug!(symbol, have = closes.len(), need = period + 2, "window too short, skipping");
        return Vec::new();
    }

    let current_rsi = compute_rsi(closes, period);
    let previous_rsi = compute_rsi(&closes[..closes.len() - 1], period);
    let last_price = closes[closes.len() - 1];

    evaluate(
        symbol,
        current_rsi,
        previous_rsi,
        last_close_time,
        last_price,
        thresholds,
        symbol_state,
    )
}

/// Render one alert event as the outgoing message text.
fn format_alert(event: &AlertEvent, interval: &str) -> String {
    let time = chrono::DateTime::<chrono::Utc>::from_timestamp_millis(event.close_time)
        .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| event.close_time.to_string());

    format!(
        "{} ({}) RSI {:.2} → {}\nPrice: {}\nTime: {}",
        event.symbol, interval, event.rsi, event.direction, event.price, time
    )
}

/// Current UNIX timestamp in milliseconds.
fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before UNIX epoch")
        .as_millis() as i64
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::Direction;

    const THRESHOLDS: Thresholds = Thresholds {
        oversold: 30.0,
        overbought: 70.0,
    };

    #[test]
    fn short_window_is_a_silent_skip() {
        let mut state = SymbolState::default();
        // period + 2 = 16 closes required; 15 is one short.
        let closes: Vec<f64> = (1..=15).map(|x| x as f64).collect();
        assert!(evaluate_series("BTCUSDT", &closes, 1_000, 14, THRESHOLDS, &mut state).is_empty());
        assert_eq!(state, SymbolState::default());
    }

    #[test]
    fn monotonic_uptrend_never_alerts_oversold() {
        // 16 monotonically increasing closes: both RSI readings are exactly
        // 100, so no crossing into either band is possible.
        let mut state = SymbolState::default();
        let closes: Vec<f64> = (0..16).map(|i| 100.0 + 2.0 * i as f64).collect();
        let events = evaluate_series("BTCUSDT", &closes, 1_000, 14, THRESHOLDS, &mut state);
        assert!(events.is_empty());
        assert_eq!(state, SymbolState::default());
    }

    #[test]
    fn sharp_drop_after_uptrend_alerts_oversold_end_to_end() {
        // 15 rising closes pin the previous RSI at 100; one deep drop pulls
        // the current RSI below the oversold band.
        let mut closes: Vec<f64> = (100..115).map(|x| x as f64).collect();
        closes.push(5.0);

        let mut state = SymbolState::default();
        let events = evaluate_series("BTCUSDT", &closes, 9_000, 14, THRESHOLDS, &mut state);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].direction, Direction::Oversold);
        assert_eq!(events[0].price, 5.0);
        assert_eq!(events[0].close_time, 9_000);
        assert_eq!(state.last_oversold, Some(9_000));

        // Re-running the same closed candle is deduped.
        let again = evaluate_series("BTCUSDT", &closes, 9_000, 14, THRESHOLDS, &mut state);
        assert!(again.is_empty());
    }

    #[test]
    fn alert_message_format() {
        let event = AlertEvent {
            symbol: "BTCUSDT".to_string(),
            direction: Direction::Oversold,
            rsi: 27.431,
            price: 50_000.5,
            close_time: 1_700_000_000_000,
        };
        let message = format_alert(&event, "15m");
        assert_eq!(
            message,
            "BTCUSDT (15m) RSI 27.43 → OVERSOLD\nPrice: 50000.5\nTime: 2023-11-14 22:13 UTC"
        );
    }
}
