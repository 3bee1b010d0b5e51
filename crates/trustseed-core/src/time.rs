//! Time and duration utilities.

use chrono::{DateTime, Duration, Utc};

/// Format a duration in human-readable form.
pub fn pretty_duration(duration: Duration) -> String {
    let millis = duration.num_milliseconds();

    if millis < 1000 {
        format!("{}ms", millis)
    } else if millis < 60_000 {
        format!("{:.1}s", millis as f64 / 1000.0)
    } else {
        let secs = duration.num_seconds();
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

/// Timestamp in the `YYMMDDHHMMSSZ` form used by openssl's `index.txt`.
pub fn index_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%y%m%d%H%M%SZ").to_string()
}
