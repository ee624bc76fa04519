// =============================================================================
// Crossing Detector — RSI threshold state machine
// =============================================================================
//
// Compares the previous and current RSI readings against the configured
// thresholds and decides whether to emit alert events. Dedup is keyed by the
// closing candle's close time, per direction: re-evaluating the same closed
// candle never re-alerts, while a genuinely new candle that lands exactly on
// the threshold still can.
//
// Comparison asymmetry is intentional and load-bearing: the previous reading
// is compared strictly (`>` / `<`), the current reading inclusively
// (`<=` / `>=`). Only the current reading has to reach the threshold.
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::state::SymbolState;

/// Which side of the band the RSI crossed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Oversold,
    Overbought,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Oversold => write!(f, "OVERSOLD"),
            Self::Overbought => write!(f, "OVERBOUGHT"),
        }
    }
}

/// RSI band edges. Oversold below, overbought above.
#[derive(Debug, Clone, Copy)]
pub struct Thresholds {
    pub oversold: f64,
    pub overbought: f64,
}

/// A threshold crossing ready to be formatted and dispatched by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertEvent {
    pub symbol: String,
    pub direction: Direction,
    pub rsi: f64,
    pub price: f64,
    pub close_time: i64,
}

/// Evaluate one symbol for threshold crossings.
///
/// Returns the events that fired. Both directions are checked independently
/// in the same call, each against its own dedup field. `symbol_state` is mutated
/// exactly when an event is emitted (the per-direction dedup field is set to
/// `close_time`); that mutation is the only side effect.
///
/// If either RSI is unavailable the evaluation is skipped entirely: no
/// events, no state change.
pub fn evaluate(
    symbol: &str,
    current_rsi: Option<f64>,
    previous_rsi: Option<f64>,
    close_time: i64,
    price: f64,
    thresholds: Thresholds,
    symbol_state: &mut SymbolState,
) -> Vec<AlertEvent> {
    let (current, previous) = match (current_rsi, previous_rsi) {
        (Some(c), Some(p)) => (c, p),
        _ => return Vec::new(),
    };

    let mut events = Vec::new();

    // Cross into oversold.
    if previous > thresholds.oversold
        && current <= thresholds.oversold
        && symbol_state.last_oversold != Some(close_time)
    {
        events.push(AlertEvent {
            symbol: symbol.to_string(),
            direction: Direction::Oversold,
            rsi: current,
            price,
            close_time,
        });
        symbol_state.last_oversold = Some(close_time);
    }

    // Cross into overbought.
    if previous < thresholds.overbought
        && current >= thresholds.overbought
        && symbol_state.last_overbought != Some(close_time)
    {
        events.push(AlertEvent {
            symbol: symbol.to_string(),
            direction: Direction::Overbought,
            rsi: current,
            price,
            close_time,
        });
        symbol_state.last_overbought = Some(close_time);
    }

    events
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    const THRESHOLDS: Thresholds = Thresholds {
        oversold: 30.0,
        overbought: 70.0,
    };

    fn eval(
        current: Option<f64>,
        previous: Option<f64>,
        close_time: i64,
        state: &mut SymbolState,
    ) -> Vec<AlertEvent> {
        evaluate("BTCUSDT", current, previous, close_time, 50_000.0, THRESHOLDS, state)
    }

    #[test]
    fn oversold_crossing_fires() {
        let mut state = SymbolState::default();
        let events = eval(Some(28.0), Some(35.0), 1_000, &mut state);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].direction, Direction::Oversold);
        assert_eq!(events[0].rsi, 28.0);
        assert_eq!(state.last_oversold, Some(1_000));
        assert_eq!(state.last_overbought, None);
    }

    #[test]
    fn no_event_when_already_below_threshold() {
        // 25 -> 28 never crossed the band edge from above.
        let mut state = SymbolState::default();
        assert!(eval(Some(28.0), Some(25.0), 1_000, &mut state).is_empty());
        assert_eq!(state, SymbolState::default());
    }

    #[test]
    fn overbought_crossing_fires_and_leaves_oversold_untouched() {
        let mut state = SymbolState::default();
        let events = eval(Some(71.0), Some(69.0), 2_000, &mut state);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].direction, Direction::Overbought);
        assert_eq!(state.last_overbought, Some(2_000));
        assert_eq!(state.last_oversold, None);
    }

    #[test]
    fn same_close_time_never_realerts() {
        let mut state = SymbolState::default();
        let first = eval(Some(28.0), Some(35.0), 1_000, &mut state);
        assert_eq!(first.len(), 1);
        let second = eval(Some(28.0), Some(35.0), 1_000, &mut state);
        assert!(second.is_empty());
    }

    #[test]
    fn new_close_time_alerts_again() {
        let mut state = SymbolState::default();
        assert_eq!(eval(Some(28.0), Some(35.0), 1_000, &mut state).len(), 1);
        // A later candle crossing again is a fresh event.
        assert_eq!(eval(Some(29.0), Some(31.0), 2_000, &mut state).len(), 1);
        assert_eq!(state.last_oversold, Some(2_000));
    }

    #[test]
    fn current_exactly_on_threshold_fires() {
        // Inclusive comparison on the current reading: landing exactly on
        // the band edge counts as a crossing.
        let mut state = SymbolState::default();
        let events = eval(Some(30.0), Some(30.1), 1_000, &mut state);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].direction, Direction::Oversold);
    }

    #[test]
    fn previous_exactly_on_threshold_does_not_fire() {
        // Strict comparison on the previous reading: it must have been
        // outside the band, not on the edge.
        let mut state = SymbolState::default();
        assert!(eval(Some(28.0), Some(30.0), 1_000, &mut state).is_empty());
    }

    #[test]
    fn undefined_rsi_skips_evaluation() {
        let mut state = SymbolState::default();
        assert!(eval(None, Some(35.0), 1_000, &mut state).is_empty());
        assert!(eval(Some(28.0), None, 1_000, &mut state).is_empty());
        assert!(eval(None, None, 1_000, &mut state).is_empty());
        assert_eq!(state, SymbolState::default());
    }

    #[test]
    fn oversold_dedup_does_not_suppress_overbought_check() {
        // Both conditions are evaluated in the same call even when the
        // oversold dedup entry already points at this candle.
        let mut state = SymbolState {
            last_oversold: Some(1_000),
            last_overbought: None,
        };
        let events = eval(Some(71.0), Some(69.0), 1_000, &mut state);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].direction, Direction::Overbought);
    }

    #[test]
    fn dedup_is_per_direction() {
        let mut state = SymbolState::default();
        assert_eq!(eval(Some(28.0), Some(35.0), 1_000, &mut state).len(), 1);
        // Same candle, opposite direction: the oversold dedup entry must not
        // block an overbought crossing.
        assert_eq!(eval(Some(71.0), Some(69.0), 1_000, &mut state).len(), 1);
    }

    #[test]
    fn monotonic_uptrend_cannot_cross_into_oversold() {
        // RSI pinned at 100 on both readings: no crossing is possible.
        let mut state = SymbolState::default();
        assert!(eval(Some(100.0), Some(100.0), 1_000, &mut state).is_empty());
    }
}
