//! Centralized runtime constants for connwatch.
//!
//! All tunable bounds, intervals, and literals are collected here so they can
//! be found and adjusted in a single place rather than scattered across modules.

use crate::error::AppError;

/// Maximum number of rows kept in the closed-connections view.
pub const MAX_CLOSED_ROWS: usize = 500;

/// Hop name that routes a connection into the `Proxy` bucket.
pub const PROXY_HOP: &str = "Proxy";

/// Capacity of the channel carrying snapshot messages to the ingestor.
pub const SNAPSHOT_CHANNEL_CAPACITY: usize = 64;

/// Interval at which the summary reporter logs the published views (seconds).
pub const SUMMARY_INTERVAL_SECS: u64 = 2;

/// Number of top connections included in the periodic summary log.
pub const TOP_CONNECTIONS_COUNT: usize = 5;

/// Environment variable overriding [`MAX_CLOSED_ROWS`].
pub const MAX_CLOSED_ROWS_ENV: &str = "CONNWATCH_MAX_CLOSED_ROWS";

/// Runtime configuration of the reconciliation engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Bound on the closed view; the history window is `active + max_closed_rows`.
    pub max_closed_rows: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_closed_rows: MAX_CLOSED_ROWS,
        }
    }
}

impl EngineConfig {
    /// Build the config from the process environment, falling back to defaults.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_override(std::env::var(MAX_CLOSED_ROWS_ENV).ok().as_deref())
    }

    fn from_override(max_closed_rows: Option<&str>) -> Result<Self, AppError> {
        let Some(raw) = max_closed_rows else {
            return Ok(Self::default());
        };
        let max_closed_rows = raw.trim().parse::<usize>().map_err(|e| {
            AppError::InvalidInput(format!("{MAX_CLOSED_ROWS_ENV}={raw:?}: {e}"))
        })?;
        if max_closed_rows == 0 {
            return Err(AppError::InvalidInput(format!(
                "{MAX_CLOSED_ROWS_ENV} must be greater than zero"
            )));
        }
        Ok(Self { max_closed_rows })
    }
}
