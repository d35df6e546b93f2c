//! Counter domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Lifetime of every cached counter value. Each cache write resets it.
pub const COUNTER_TTL: Duration = Duration::from_secs(10 * 60 * 60);

/// Shortest accepted counter name (after trimming).
pub const MIN_NAME_LEN: usize = 3;

/// Longest accepted counter name (after trimming).
pub const MAX_NAME_LEN: usize = 50;

/// Identifier assigned by the durable store when a counter is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CounterId(pub i64);

impl CounterId {
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for CounterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CounterId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .map(CounterId)
            .map_err(|_| format!("invalid counter id: {s}"))
    }
}

impl From<i64> for CounterId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// A named counter as held by the durable store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counter {
    pub id: CounterId,
    pub name: String,
    pub value: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Counter {
    /// Add `amount` to the value and stamp `updated_at`.
    ///
    /// Returns `None` (leaving the counter untouched) if the result does
    /// not fit in an `i64`.
    pub fn apply_increment(&mut self, amount: i64) -> Option<i64> {
        let next = self.value.checked_add(amount)?;
        self.value = next;
        self.updated_at = Utc::now();
        Some(next)
    }
}

/// Normalize and validate a counter name.
pub fn validate_name(name: &str) -> Result<String, String> {
    let trimmed = name.trim();
    let len = trimmed.chars().count();

    if len < MIN_NAME_LEN {
        return Err(format!(
            "counter name must be at least {MIN_NAME_LEN} characters"
        ));
    }
    if len > MAX_NAME_LEN {
        return Err(format!(
            "counter name must be at most {MAX_NAME_LEN} characters"
        ));
    }
    if trimmed.chars().any(char::is_control) {
        return Err("counter name must not contain control characters".to_string());
    }

    Ok(trimmed.to_string())
}

/// Where a read was served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadSource {
    Cache,
    Store,
}

impl ReadSource {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::Store => "store",
        }
    }
}

impl fmt::Display for ReadSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a counter read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterReading {
    pub id: CounterId,
    pub value: i64,
    pub source: ReadSource,
}
