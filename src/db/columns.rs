//! Conversions between model fields and SQLite column values.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};

/// Second counts are stored as INTEGER, which tops out at `i64::MAX`.
pub(crate) fn secs_to_sql(secs: u64) -> Result<i64> {
    i64::try_from(secs).map_err(|_| anyhow!("{secs}s does not fit an INTEGER column"))
}

pub(crate) fn secs_from_sql(value: i64, column: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| anyhow!("{column} holds negative seconds ({value})"))
}

pub(crate) fn timestamp_from_sql(raw: &str, column: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("{column} is not an RFC 3339 timestamp: {raw}"))?
        .with_timezone(&Utc))
}
