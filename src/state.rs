// =============================================================================
// Alert State — per-symbol dedup snapshot with atomic save
// =============================================================================
//
// Maps each uppercase symbol to the close times of its last-alerted candles,
// one per direction. Loaded once at startup, mutated by the crossing
// detector, persisted after every poll cycle.
//
// Persistence uses a tmp + rename pattern so a crash mid-write cannot
// corrupt a previously valid snapshot. A missing or unreadable file loads as
// an empty mapping, never an error: worst case the bot re-sends one alert.
// =============================================================================

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Dedup bookkeeping for a single symbol.
///
/// Each field holds the close time (epoch milliseconds) of the candle that
/// last produced an alert in that direction. Absent fields are omitted from
/// the serialised snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_oversold: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_overbought: Option<i64>,
}

/// The full persisted mapping. Owned by the poll loop for the lifetime of
/// the process; entries are created on first evaluation and never deleted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertState {
    symbols: HashMap<String, SymbolState>,
}

impl AlertState {
    /// Load the snapshot from `path`.
    ///
    /// Fails soft: a missing file is a normal fresh start, and an unreadable
    /// or corrupt file degrades to an empty mapping with a warning.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "no previous alert state, starting fresh");
                return Self::default();
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read alert state, starting fresh");
                return Self::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(state) => {
                info!(path = %path.display(), "alert state loaded");
                state
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "corrupt alert state, starting fresh");
                Self::default()
            }
        }
    }

    /// Persist the full mapping to `path` using an atomic write (write to a
    /// tmp sibling, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise alert state to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp state to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp state to {}", path.display()))?;

        Ok(())
    }

    /// Mutable dedup entry for `symbol`, created empty on first access.
    pub fn entry(&mut self, symbol: &str) -> &mut SymbolState {
        self.symbols.entry(symbol.to_string()).or_default()
    }

    #[cfg(test)]
    pub fn get(&self, symbol: &str) -> Option<&SymbolState> {
        self.symbols.get(symbol)
    }
}
