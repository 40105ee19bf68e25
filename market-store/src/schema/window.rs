//! Time windows and aggregation labels used by the maintenance jobs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::{RepositoryError, RepositoryResult};

/// Longest aggregation label accepted
const MAX_AGGREGATION_LEN: usize = 32;

/// Half-open time range `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    /// Create a window, rejecting empty or inverted ranges
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> RepositoryResult<Self> {
        if end <= start {
            return Err(RepositoryError::InvalidData(format!(
                "Window end {} must be after start {}",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Number of whole minutes in the window, rounded down.
    ///
    /// Each symbol is expected to have one sourced bar per minute.
    pub fn expected_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Aggregation granularity label (e.g., "5min", "1hour")
///
/// Stored verbatim in the aggregate table and bound as a parameter to the
/// aggregation templates. Interval-style labels such as "15 minutes" are
/// accepted as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Aggregation(String);

impl Aggregation {
    pub fn new(label: impl Into<String>) -> RepositoryResult<Self> {
        let label = label.into();

        if label.is_empty() {
            return Err(RepositoryError::InvalidData(
                "Aggregation label must not be empty".into(),
            ));
        }
        if label.len() > MAX_AGGREGATION_LEN {
            return Err(RepositoryError::InvalidData(format!(
                "Aggregation label '{}' exceeds {} characters",
                label, MAX_AGGREGATION_LEN
            )));
        }
        Ok(Self(label))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for Aggregation {
    type Err = RepositoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Aggregation {
    type Error = RepositoryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Aggregation> for String {
    fn from(value: Aggregation) -> Self {
        value.0
    }
}

impl std::fmt::Display for Aggregation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, 1, h, m, 0).unwrap()
    }

    #[test]
    fn test_window_rejects_inverted_and_empty() {
        assert!(TimeWindow::new(at(1, 0), at(0, 0)).is_err());
        assert!(TimeWindow::new(at(1, 0), at(1, 0)).is_err());
        assert!(TimeWindow::new(at(0, 0), at(1, 0)).is_ok());
    }

    #[test]
    fn test_expected_minutes_one_hour() {
        let window = TimeWindow::new(at(0, 0), at(1, 0)).unwrap();
        assert_eq!(window.expected_minutes(), 60);
    }

    #[test]
    fn test_expected_minutes_floors_partial_minutes() {
        let window = TimeWindow::new(at(0, 0), at(0, 2) + Duration::seconds(59)).unwrap();
        assert_eq!(window.expected_minutes(), 2);

        let short = TimeWindow::new(at(0, 0), at(0, 0) + Duration::seconds(30)).unwrap();
        assert_eq!(short.expected_minutes(), 0);
    }

    #[test]
    fn test_expected_minutes_manual_trigger_range() {
        let start = Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 5, 5, 23, 59, 0).unwrap();
        let window = TimeWindow::new(start, end).unwrap();
        // 34 days plus 23h59m
        assert_eq!(window.expected_minutes(), 34 * 24 * 60 + 23 * 60 + 59);
    }

    #[test]
    fn test_aggregation_validation() {
        assert_eq!(Aggregation::new("5min").unwrap().as_str(), "5min");
        assert_eq!("1hour".parse::<Aggregation>().unwrap().to_string(), "1hour");
        assert!(Aggregation::new("").is_err());
        assert!(Aggregation::new("x".repeat(33)).is_err());
        assert!(Aggregation::new("x".repeat(32)).is_ok());
    }

    #[test]
    fn test_aggregation_accepts_interval_labels() {
        let agg = Aggregation::new("1 hour").unwrap();
        assert_eq!(agg.as_str(), "1 hour");
        assert_eq!(agg.to_string(), "1 hour");
        assert_eq!("15 minutes".parse::<Aggregation>().unwrap().as_str(), "15 minutes");

        // Bound as a parameter, never spliced into SQL
        let quoted = Aggregation::new("5min'; --").unwrap();
        assert_eq!(quoted.as_str(), "5min'; --");
    }

    #[test]
    fn test_aggregation_serde_validates() {
        let agg: Aggregation = serde_json::from_str("\"15min\"").unwrap();
        assert_eq!(agg.as_str(), "15min");
        assert!(serde_json::from_str::<Aggregation>("\"\"").is_err());
        let spaced: Aggregation = serde_json::from_str("\"1 hour\"").unwrap();
        assert_eq!(serde_json::to_string(&spaced).unwrap(), "\"1 hour\"");
        assert_eq!(serde_json::to_string(&agg).unwrap(), "\"15min\"");
    }
}
