//! Estimating current arrival times from a cached snapshot.
//!
//! Consumers call these on every display refresh instead of re-querying.
//! Everything here is a pure function of the snapshot and `now`.

use chrono::{DateTime, Utc};

use crate::snapshot::Snapshot;

/// Remaining seconds for each arrival at `now`: `s_i - (now - queried_at)`.
///
/// Values may be zero or negative once a vehicle is due. Returns an empty
/// list for the initial snapshot.
pub fn remaining_seconds(snapshot: &Snapshot, now: DateTime<Utc>) -> Vec<i64> {
    let Some(queried_at) = snapshot.queried_at() else {
        return Vec::new();
    };
    let elapsed = (now - queried_at).num_seconds();

    snapshot
        .arrivals()
        .iter()
        .map(|&s| i64::from(s) - elapsed)
        .collect()
}

/// Whole minutes, truncated toward zero.
pub fn whole_minutes(seconds: i64) -> i64 {
    seconds / 60
}

/// Consumer-side trimming of extrapolated arrivals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayFilter {
    /// Drop arrivals at or below this many whole minutes.
    pub min_minutes: i64,
    /// Keep at most this many arrivals (`None` keeps all).
    pub max_predictions: Option<usize>,
}

impl Default for DisplayFilter {
    fn default() -> Self {
        Self {
            min_minutes: 0,
            max_predictions: None,
        }
    }
}

impl DisplayFilter {
    /// Extrapolates `snapshot` to `now` and returns whole minutes that pass
    /// the floor, in snapshot order.
    pub fn minutes(&self, snapshot: &Snapshot, now: DateTime<Utc>) -> Vec<i64> {
        let limit = self.max_predictions.unwrap_or(usize::MAX);
        remaining_seconds(snapshot, now)
            .into_iter()
            .map(whole_minutes)
            .filter(|&m| m > self.min_minutes)
            .take(limit)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_extrapolates_elapsed_time() {
        let snapshot = Snapshot::new(vec![300, 600, 1200], at(1000));
        let remaining = remaining_seconds(&snapshot, at(1100));
        assert_eq!(remaining, vec![200, 500, 1100]);

        let minutes: Vec<_> = remaining.into_iter().map(whole_minutes).collect();
        assert_eq!(minutes, vec![3, 8, 18]);
    }

    #[test]
    fn test_same_instant_gives_same_answer() {
        let snapshot = Snapshot::new(vec![90, 45, 700], at(50));
        let now = at(77);
        assert_eq!(remaining_seconds(&snapshot, now), remaining_seconds(&snapshot, now));
    }

    #[test]
    fn test_keeps_service_order() {
        let snapshot = Snapshot::new(vec![600, 120, 300], at(0));
        assert_eq!(remaining_seconds(&snapshot, at(60)), vec![540, 60, 240]);
    }

    #[test]
    fn test_overdue_arrivals_go_negative() {
        let snapshot = Snapshot::new(vec![30], at(0));
        assert_eq!(remaining_seconds(&snapshot, at(150)), vec![-120]);
        assert_eq!(whole_minutes(-119), -1);
    }

    #[test]
    fn test_initial_snapshot_has_no_estimates() {
        assert!(remaining_seconds(&Snapshot::initial(), at(1_000)).is_empty());
    }

    #[test]
    fn test_display_filter_drops_short_and_limits_count() {
        let snapshot = Snapshot::new(vec![120, 400, 900, 1500, 2400], at(0));
        let filter = DisplayFilter {
            min_minutes: 5,
            max_predictions: Some(2),
        };
        // 120s -> 2 min (dropped), 400s -> 6, 900s -> 15, rest cut by limit
        assert_eq!(filter.minutes(&snapshot, at(0)), vec![6, 15]);
    }

    #[test]
    fn test_default_filter_drops_due_vehicles() {
        let snapshot = Snapshot::new(vec![30, 200], at(0));
        assert_eq!(DisplayFilter::default().minutes(&snapshot, at(0)), vec![3]);
        assert!(DisplayFilter::default().minutes(&Snapshot::new(vec![30], at(0)), at(0)).is_empty());
    }

    #[test]
    fn test_display_filter_drops_arrivals_at_floor() {
        let snapshot = Snapshot::new(vec![300, 330, 400], at(0));
        let filter = DisplayFilter {
            min_minutes: 5,
            max_predictions: None,
        };
        assert_eq!(filter.minutes(&snapshot, at(0)), vec![6]);
    }
}
