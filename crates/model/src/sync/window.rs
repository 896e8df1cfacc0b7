use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

/// Time range an extraction covers: everything, or the last N days of
/// `updated_at_property`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionWindow {
    pub days: u32,
    pub property: Option<String>,
    pub since: Option<DateTime<Utc>>,
}

impl ExtractionWindow {
    pub fn new(days: u32, property: Option<String>, now: DateTime<Utc>) -> Self {
        let since = (days > 0).then(|| now - Duration::days(i64::from(days)));
        Self {
            days,
            property,
            since,
        }
    }

    pub fn full() -> Self {
        Self {
            days: 0,
            property: None,
            since: None,
        }
    }

    pub fn is_full(&self) -> bool {
        self.since.is_none()
    }

    /// Property and lower bound, when the window actually filters.
    pub fn bound(&self) -> Option<(&str, DateTime<Utc>)> {
        match (self.property.as_deref(), self.since) {
            (Some(property), Some(since)) => Some((property, since)),
            _ => None,
        }
    }

    pub fn since_date(&self) -> Option<NaiveDate> {
        self.since.map(|s| s.date_naive())
    }

    /// On-or-after semantics: a record exactly `days` old is still inside.
    pub fn includes(&self, updated_at: DateTime<Utc>) -> bool {
        match self.since {
            None => true,
            Some(since) => updated_at >= since,
        }
    }
}
