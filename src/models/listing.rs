// src/models/listing.rs

use chrono::{DateTime, Months, Utc};
use serde::Deserialize;

pub const DEFAULT_LIMIT: i64 = 9;
pub const MAX_LIMIT: i64 = 100;

/// Offset pagination shared by the admin listings.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub start_index: Option<i64>,
    pub limit: Option<i64>,
    /// `asc` for oldest first, anything else newest first.
    pub sort: Option<String>,
}

impl ListParams {
    pub fn window(&self) -> (i64, i64) {
        window(self.start_index, self.limit)
    }

    pub fn direction(&self) -> &'static str {
        direction(self.sort.as_deref())
    }
}

/// Normalizes an (offset, limit) pair: negatives become defaults, limit is capped.
pub fn window(start_index: Option<i64>, limit: Option<i64>) -> (i64, i64) {
    let offset = start_index.filter(|v| *v >= 0).unwrap_or(0);
    let limit = limit
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_LIMIT)
        .min(MAX_LIMIT);
    (offset, limit)
}

/// SQL sort keyword for a user-supplied direction flag.
pub fn direction(flag: Option<&str>) -> &'static str {
    match flag {
        Some("asc") => "ASC",
        _ => "DESC",
    }
}

/// Start of the trailing calendar month: same day-of-month, one month back.
/// Days past the end of the shorter month clamp to its last day.
pub fn one_month_ago(now: DateTime<Utc>) -> DateTime<Utc> {
    now.checked_sub_months(Months::new(1)).unwrap_or(now)
}
