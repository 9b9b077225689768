use std::time::{SystemTime, UNIX_EPOCH};

use tracing::Level;

/// `--log-level` value to a tracing level. Case and surrounding blanks are ignored.
pub fn parse_log_level(raw: &str) -> Option<Level> {
    let level = match raw.trim().to_ascii_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => return None,
    };
    Some(level)
}

/// Seconds since the epoch for `created_at`; a clock set before 1970 reads as 0.
pub fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

/// Shortened hex id for log lines.
pub fn short_id(id: &str) -> &str {
    id.get(..12).unwrap_or(id)
}
