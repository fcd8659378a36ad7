use std::time::Duration;

use chrono::{Datelike, Months, Utc};
use serde::{Deserialize, Deserializer};

pub type Timestamp = chrono::DateTime<Utc>;

/// Creators must have been onboarded at least this long before a run to be analyzed.
pub const ONBOARDING_GRACE_DAYS: i64 = 7;

/// The start of the telemetry window a run looks at.
///
/// Computed once when a run starts and handed by value to every extractor, so all creators
/// in the same run share exactly the same window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lookback(Timestamp);

impl Lookback {
    /// Midnight UTC on the first day of the month `months` calendar months before `now`'s month.
    ///
    /// `None` when that month lies outside the calendar range chrono supports.
    pub fn starting(now: Timestamp, months: u32) -> Option<Self> {
        let start = now
            .date_naive()
            .with_day(1)?
            .checked_sub_months(Months::new(months))?
            .and_hms_opt(0, 0, 0)?
            .and_utc();

        Some(Self(start))
    }

    pub fn start(self) -> Timestamp {
        self.0
    }
}

impl From<Timestamp> for Lookback {
    fn from(start: Timestamp) -> Self {
        Self(start)
    }
}

/// Creators onboarded before this instant are old enough to be analyzed.
pub fn eligibility_cutoff(now: Timestamp) -> Timestamp {
    now - chrono::Duration::days(ONBOARDING_GRACE_DAYS)
}

/// Deserialize an optional human readable duration such as `10s` or `1m 30s`.
pub fn deserialize_duration<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(text) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };

    humantime::parse_duration(&text)
        .map(Some)
        .map_err(serde::de::Error::custom)
}
