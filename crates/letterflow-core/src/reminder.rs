//! Reminder scheduling
//!
//! Computes when the next reminder should fire from the deadline and a list
//! of day-marks (days before the deadline). All functions are pure: given
//! identical inputs they return identical results, so the sweep can re-run
//! a decision at any time.

use crate::types::ReminderFrequency;
use chrono::{DateTime, Duration, Utc};

pub const MINIMAL_INTERVALS: [u32; 2] = [7, 1];
pub const STANDARD_INTERVALS: [u32; 3] = [7, 3, 1];
pub const AGGRESSIVE_INTERVALS: [u32; 6] = [10, 7, 5, 3, 2, 1];

/// Canonical day-marks for a frequency, used when the caller supplied none.
///
/// `Custom` with no explicit intervals falls back to the standard set
/// rather than scheduling nothing.
pub fn default_intervals(frequency: ReminderFrequency) -> Vec<u32> {
    match frequency {
        ReminderFrequency::Minimal => MINIMAL_INTERVALS.to_vec(),
        ReminderFrequency::Standard | ReminderFrequency::Custom => STANDARD_INTERVALS.to_vec(),
        ReminderFrequency::Aggressive => AGGRESSIVE_INTERVALS.to_vec(),
    }
}

/// Sort descending and deduplicate. Unsorted caller input is tolerated.
pub fn normalize_intervals(intervals: &[u32]) -> Vec<u32> {
    let mut out = intervals.to_vec();
    out.sort_unstable_by(|a, b| b.cmp(a));
    out.dedup();
    out
}

/// The schedule actually in force: explicit non-empty intervals win,
/// the frequency supplies a default otherwise.
pub fn effective_intervals(frequency: ReminderFrequency, explicit: &[u32]) -> Vec<u32> {
    if explicit.is_empty() {
        default_intervals(frequency)
    } else {
        normalize_intervals(explicit)
    }
}

/// Smallest candidate date `deadline - days` that is still >= `now`.
///
/// `None` means every candidate is already in the past and the request
/// proceeds straight to overdue handling.
pub fn next_reminder_date(
    deadline: DateTime<Utc>,
    intervals: &[u32],
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    intervals
        .iter()
        .map(|days| deadline - Duration::days(i64::from(*days)))
        .filter(|candidate| *candidate >= now)
        .min()
}

/// Recompute after a confirmed send: candidates at or before `now` are
/// spent, only strictly later day-marks remain.
pub fn advance(
    deadline: DateTime<Utc>,
    intervals: &[u32],
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    intervals
        .iter()
        .map(|days| deadline - Duration::days(i64::from(*days)))
        .filter(|candidate| *candidate > now)
        .min()
}

/// True iff a reminder should fire right now.
pub fn is_due(next: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    matches!(next, Some(at) if now >= at)
}
