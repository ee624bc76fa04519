// =============================================================================
// Configuration — typed, environment-sourced, resolved once at startup
// =============================================================================
//
// Every tunable lives in one struct so validation happens in one place and
// the rest of the code never touches the environment. A malformed numeric
// value or an empty symbol list is fatal at startup with a diagnostic;
// missing notifier credentials are not an error, they only disable that
// channel.
// =============================================================================

use anyhow::{bail, Context, Result};

/// Default number of klines requested per fetch. Generous relative to the
/// RSI window so the Wilder recurrence has history to smooth over.
pub const KLINE_FETCH_LIMIT: u32 = 200;

/// Resolved bot configuration. Immutable after startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Symbols to evaluate, uppercase, in configured order.
    pub symbols: Vec<String>,
    /// Candle interval, passed through to the data source (e.g. "15m").
    pub interval: String,
    /// RSI look-back period.
    pub rsi_period: usize,
    /// RSI level at or below which an oversold crossing fires.
    pub oversold: f64,
    /// RSI level at or above which an overbought crossing fires.
    pub overbought: f64,
    /// Seconds to sleep between poll cycles.
    pub check_every_seconds: u64,
    /// Path of the persisted dedup snapshot.
    pub state_file: String,

    // Notifier credentials. Each channel needs its full pair to be enabled.
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub callmebot_phone: Option<String>,
    pub callmebot_apikey: Option<String>,
}

impl Config {
    /// Resolve the configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve the configuration through an arbitrary variable lookup.
    /// `from_env` is the production path; tests inject a map.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let symbols = parse_symbols(&lookup("SYMBOLS").unwrap_or_else(|| "BTCUSDT".to_string()));
        if symbols.is_empty() {
            bail!("SYMBOLS must contain at least one symbol");
        }

        let interval = lookup("INTERVAL").unwrap_or_else(|| "15m".to_string());

        let rsi_period: usize = parse_or(&lookup, "RSI_PERIOD", 14)?;
        if rsi_period == 0 {
            bail!("RSI_PERIOD must be a positive integer");
        }

        let oversold: f64 = parse_or(&lookup, "RSI_OVERSOLD", 30.0)?;
        let overbought: f64 = parse_or(&lookup, "RSI_OVERBOUGHT", 70.0)?;

        let check_every_seconds: u64 = parse_or(&lookup, "CHECK_EVERY_SECONDS", 60)?;
        if check_every_seconds == 0 {
            bail!("CHECK_EVERY_SECONDS must be a positive integer");
        }

        let state_file = lookup("STATE_FILE").unwrap_or_else(|| "state.json".to_string());

        Ok(Self {
            symbols,
            interval,
            rsi_period,
            oversold,
            overbought,
            check_every_seconds,
            state_file,
            telegram_bot_token: non_empty(lookup("TELEGRAM_BOT_TOKEN")),
            telegram_chat_id: non_empty(lookup("TELEGRAM_CHAT_ID")),
            callmebot_phone: non_empty(lookup("CALLMEBOT_PHONE")),
            callmebot_apikey: non_empty(lookup("CALLMEBOT_APIKEY")),
        })
    }
}

/// Split a comma-separated symbol list, trimming whitespace, uppercasing,
/// and dropping empty entries.
pub fn parse_symbols(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {name}: {raw:?}")),
        None => Ok(default),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
