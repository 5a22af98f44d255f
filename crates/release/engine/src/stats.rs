//! Stats aggregation
//!
//! Computed on demand from release snapshots; nothing here is cached.

use chrono::{DateTime, Utc};
use release_types::{
    BatchRelease, CheckpointStatus, ReleaseStats, ReleaseStatus, StatsWindow, StatusStats,
};

fn hours_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - start).num_seconds() as f64 / 3600.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn average(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(round2(values.iter().sum::<f64>() / values.len() as f64))
    }
}

/// When a release of the given status stopped being worked on
fn duration_end(release: &BatchRelease) -> Option<DateTime<Utc>> {
    match release.status {
        ReleaseStatus::Released => release.actual_completion_date,
        ReleaseStatus::Rejected => release.closed_at,
        ReleaseStatus::Approved => release.approved_at,
        _ => None,
    }
}

/// Aggregate releases initiated inside `window`, counted back from `now`
pub fn aggregate(releases: &[BatchRelease], now: DateTime<Utc>, window: StatsWindow) -> ReleaseStats {
    let in_window: Vec<&BatchRelease> = releases
        .iter()
        .filter(|r| window.contains(now, r.initiated_at))
        .collect();

    let by_status = ReleaseStatus::ALL
        .into_iter()
        .map(|status| {
            let matching: Vec<&&BatchRelease> =
                in_window.iter().filter(|r| r.status == status).collect();
            let durations: Vec<f64> = matching
                .iter()
                .filter_map(|r| duration_end(r).map(|end| hours_between(r.initiated_at, end)))
                .collect();
            StatusStats {
                status,
                count: matching.len(),
                avg_duration_hours: average(&durations),
            }
        })
        .collect();

    let checkpoint_hours: Vec<f64> = in_window
        .iter()
        .flat_map(|r| r.checkpoints.iter())
        .filter(|c| matches!(c.status, CheckpointStatus::Passed | CheckpointStatus::Failed))
        .filter_map(|c| match (c.started_at, c.completed_at) {
            (Some(start), Some(end)) => Some(hours_between(start, end)),
            _ => None,
        })
        .collect();

    ReleaseStats {
        by_status,
        total_releases: in_window.len(),
        avg_checkpoint_completion_hours: average(&checkpoint_hours),
        time_range_days: window.days,
    }
}
