//! Date-and-time conversions for log lines and the `Stats` timestamp
//! annotation

use std::time::SystemTime;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Local};

pub fn system_time_to_rfc3339(t: SystemTime) -> String {
    let t: DateTime<Local> = DateTime::from(t);
    t.to_rfc3339()
}

/// Accepts "now" or an RFC 3339 string.
pub fn parse_timestamp(s: &str) -> Result<SystemTime> {
    if s == "now" {
        return Ok(SystemTime::now());
    }
    let t = DateTime::parse_from_rfc3339(s)
        .with_context(|| anyhow!("expecting \"now\" or an RFC 3339 time, got {s:?}"))?;
    Ok(t.into())
}
