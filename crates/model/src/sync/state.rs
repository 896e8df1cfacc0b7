use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted per-table sync bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
    #[serde(default)]
    pub last_sync_attempt_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_successful_sync_at: Option<DateTime<Utc>>,
}

impl SyncState {
    /// Applies a partial update: only the supplied fields change.
    pub fn apply(&mut self, update: &SyncUpdate) {
        if let Some(at) = update.last_sync_attempt_at {
            self.last_sync_attempt_at = Some(at);
        }
        if let Some(at) = update.last_successful_sync_at {
            self.last_successful_sync_at = Some(at);
        }
    }
}

/// COALESCE-style partial update of a sync-state row. `None` leaves the
/// stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncUpdate {
    pub active: Option<bool>,
    pub last_sync_attempt_at: Option<DateTime<Utc>>,
    pub last_successful_sync_at: Option<DateTime<Utc>>,
}

impl SyncUpdate {
    pub fn attempt(at: DateTime<Utc>) -> Self {
        Self {
            last_sync_attempt_at: Some(at),
            ..Default::default()
        }
    }

    pub fn success(at: DateTime<Utc>) -> Self {
        Self {
            last_successful_sync_at: Some(at),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn apply_only_touches_supplied_fields() {
        let earlier = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();

        let mut state = SyncState {
            last_sync_attempt_at: Some(earlier),
            last_successful_sync_at: Some(earlier),
        };
        state.apply(&SyncUpdate::attempt(later));

        assert_eq!(state.last_sync_attempt_at, Some(later));
        assert_eq!(state.last_successful_sync_at, Some(earlier));
    }
}
