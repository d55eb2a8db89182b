use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};

use crate::model::FeedItem;

// ============================================================================
// Wire Types
// ============================================================================

/// Body of `POST /query`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub start: String,
    pub end: String,
    pub limit: u32,
    pub query: String,
    pub summarize: bool,
}

/// Response of `POST /query`. Missing and `null` fields both decode as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryResponse {
    #[serde(deserialize_with = "null_as_default")]
    pub summary: String,
    #[serde(deserialize_with = "null_as_default")]
    pub feeds: Vec<FeedItem>,
    #[serde(deserialize_with = "null_as_default")]
    pub count: u64,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

// ============================================================================
// Query Parameters
// ============================================================================

/// Lookback windows offered by the time-range switcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Lookback {
    Day,
    ThreeDays,
    Week,
    Month,
}

impl Lookback {
    pub const ALL: [Lookback; 4] = [
        Lookback::Day,
        Lookback::ThreeDays,
        Lookback::Week,
        Lookback::Month,
    ];

    pub fn duration(self) -> Duration {
        match self {
            Lookback::Day => Duration::days(1),
            Lookback::ThreeDays => Duration::days(3),
            Lookback::Week => Duration::days(7),
            Lookback::Month => Duration::days(30),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Lookback::Day => "24h",
            Lookback::ThreeDays => "3d",
            Lookback::Week => "7d",
            Lookback::Month => "30d",
        }
    }

    /// Next window in the cycle.
    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|l| *l == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    /// Closest preset to a number of hours (config value).
    pub fn from_hours(hours: u64) -> Self {
        match hours {
            0..=24 => Lookback::Day,
            25..=72 => Lookback::ThreeDays,
            73..=168 => Lookback::Week,
            _ => Lookback::Month,
        }
    }
}

/// User-facing query parameters, independent of the moment they are run.
///
/// Two runs with equal parameters share a cache entry even though their
/// absolute `start`/`end` bounds differ.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryParams {
    pub lookback: Lookback,
    pub query: String,
    pub limit: u32,
    pub summarize: bool,
}

impl QueryParams {
    /// Concrete request for the window ending at `now`.
    pub fn to_request(&self, now: DateTime<Utc>) -> QueryRequest {
        QueryRequest {
            start: (now - self.lookback.duration()).to_rfc3339_opts(SecondsFormat::Secs, true),
            end: now.to_rfc3339_opts(SecondsFormat::Secs, true),
            limit: self.limit,
            query: self.query.trim().to_string(),
            summarize: self.summarize,
        }
    }

    /// Cache key: hex SHA-256 of the normalized parameters.
    pub fn cache_key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.lookback.label().as_bytes());
        hasher.update([0]);
        hasher.update(self.query.trim().as_bytes());
        hasher.update([0]);
        hasher.update(self.limit.to_le_bytes());
        hasher.update([u8::from(self.summarize)]);
        hasher
            .finalize()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect()
    }
}
