use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_SNAPSHOT_INTERVAL_SECS: u64 = 300;

/// Runtime settings for the `seatline` binary, read from `SEATLINE_*` env vars.
/// Values that fail to parse fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub catalog_path: Option<PathBuf>,
    pub rosters_path: Option<PathBuf>,
    pub journal_path: Option<PathBuf>,
    pub snapshot_interval: Duration,
    pub metrics_port: Option<u16>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog_path: None,
            rosters_path: None,
            journal_path: None,
            snapshot_interval: Duration::from_secs(DEFAULT_SNAPSHOT_INTERVAL_SECS),
            metrics_port: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let path = |key: &str| lookup(key).filter(|s| !s.is_empty()).map(PathBuf::from);
        let snapshot_secs = lookup("SEATLINE_SNAPSHOT_INTERVAL_SECS")
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|&secs| secs > 0)
            .unwrap_or(DEFAULT_SNAPSHOT_INTERVAL_SECS);

        Self {
            catalog_path: path("SEATLINE_CATALOG"),
            rosters_path: path("SEATLINE_ROSTERS"),
            journal_path: path("SEATLINE_JOURNAL"),
            snapshot_interval: Duration::from_secs(snapshot_secs),
            metrics_port: lookup("SEATLINE_METRICS_PORT").and_then(|s| s.parse().ok()),
        }
    }
}
