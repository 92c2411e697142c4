use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use tracing::info;

/// Parse an RFC3339 timestamp such as `2016-01-01T00:00:00Z`
pub(crate) fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, humantime::TimestampError> {
    humantime::parse_rfc3339_weak(s).map(DateTime::<Utc>::from)
}

/// `0` asks for a seed derived from the current time. The chosen seed is logged so the run can
/// be reproduced.
pub(crate) fn resolve_seed(seed: u64) -> u64 {
    if seed != 0 {
        return seed;
    }
    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(1)
        .max(1);
    info!(seed, "using seed derived from the current time");
    seed
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn timestamps() {
        assert_eq!(
            parse_timestamp("2016-01-02T06:00:00Z").unwrap(),
            Utc.with_ymd_and_hms(2016, 1, 2, 6, 0, 0).unwrap()
        );
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn explicit_seed_is_kept() {
        assert_eq!(resolve_seed(42), 42);
        assert_ne!(resolve_seed(0), 0);
    }
}
