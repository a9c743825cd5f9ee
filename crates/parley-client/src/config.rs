//! Client configuration loaded from environment variables.
//!
//! All settings have defaults so a client can start with zero configuration.

use std::path::PathBuf;

use chrono::{FixedOffset, Local, Offset};

pub const DEFAULT_LOG_FILTER: &str = "parley_client=debug,parley_store=info,warn";

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// SQLite database file backing the document store.
    /// Env: `PARLEY_DB_PATH`
    /// Default: `None` (platform data directory, see `Database::new`).
    pub db_path: Option<PathBuf>,

    /// Offset used to decide which calendar day a message belongs to.
    /// Env: `PARLEY_UTC_OFFSET_MINUTES` (e.g. `-300`, `330`)
    /// Default: the local offset at startup.
    pub utc_offset: FixedOffset,

    /// Log filter used when `RUST_LOG` is unset.
    /// Env: `PARLEY_LOG`
    pub log_filter: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            utc_offset: Local::now().offset().fix(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ClientConfig::from_env`] with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(path) = lookup("PARLEY_DB_PATH").filter(|p| !p.trim().is_empty()) {
            config.db_path = Some(PathBuf::from(path));
        }

        if let Some(raw) = lookup("PARLEY_UTC_OFFSET_MINUTES") {
            match parse_offset_minutes(&raw) {
                Ok(offset) => config.utc_offset = offset,
                Err(e) => {
                    tracing::warn!(value = %raw, error = %e, "Invalid PARLEY_UTC_OFFSET_MINUTES, using local offset");
                }
            }
        }

        if let Some(filter) = lookup("PARLEY_LOG").filter(|f| !f.trim().is_empty()) {
            config.log_filter = filter;
        }

        config
    }

    /// Override the grouping offset, mostly useful in tests.
    pub fn with_utc_offset(mut self, offset: FixedOffset) -> Self {
        self.utc_offset = offset;
        self
    }
}

/// Largest accepted offset magnitude, in minutes (18 hours).
const MAX_OFFSET_MINUTES: i32 = 18 * 60;

/// Parse a signed minute count into a UTC offset (±18h max).
fn parse_offset_minutes(raw: &str) -> Result<FixedOffset, String> {
    let minutes: i32 = raw
        .trim()
        .parse()
        .map_err(|e| format!("not an integer: {e}"))?;
    if !(-MAX_OFFSET_MINUTES..=MAX_OFFSET_MINUTES).contains(&minutes) {
        return Err(format!("offset out of range: {minutes} minutes"));
    }
    FixedOffset::east_opt(minutes * 60)
        .ok_or_else(|| format!("offset out of range: {minutes} minutes"))
}
