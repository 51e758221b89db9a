//! Reminder sweep windows.

use chrono::{DateTime, Duration, Utc};

use stride_common::types::ReminderKind;

/// Half-open time interval `[from, to)` used to select runs eligible for a
/// reminder sweep. Computed fresh from "now" on every sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderWindow {
    pub kind: ReminderKind,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl ReminderWindow {
    /// Window for a sweep kind relative to `now`:
    ///
    /// - `day_before`: runs starting in `[now+24h, now+48h)`
    /// - `hour_before`: runs starting in `[now+1h, now+2h)`
    pub fn for_kind(kind: ReminderKind, now: DateTime<Utc>) -> Self {
        let (from, to) = match kind {
            ReminderKind::DayBefore => (now + Duration::hours(24), now + Duration::hours(48)),
            ReminderKind::HourBefore => (now + Duration::hours(1), now + Duration::hours(2)),
        };

        Self { kind, from, to }
    }

    /// Whether `ts` falls inside the window. Inclusive start, exclusive end.
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.from && ts < self.to
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_before_includes_exact_start() {
        let now = Utc::now();
        let window = ReminderWindow::for_kind(ReminderKind::DayBefore, now);
        assert!(window.contains(now + Duration::hours(24)));
    }

    #[test]
    fn test_day_before_excludes_exact_end() {
        let now = Utc::now();
        let window = ReminderWindow::for_kind(ReminderKind::DayBefore, now);
        assert!(!window.contains(now + Duration::hours(48)));
    }

    #[test]
    fn test_ninety_minutes_is_hour_before_only() {
        let now = Utc::now();
        let ts = now + Duration::minutes(90);
        assert!(ReminderWindow::for_kind(ReminderKind::HourBefore, now).contains(ts));
        assert!(!ReminderWindow::for_kind(ReminderKind::DayBefore, now).contains(ts));
    }

    #[test]
    fn test_thirty_minutes_in_neither_window() {
        let now = Utc::now();
        let ts = now + Duration::minutes(30);
        assert!(!ReminderWindow::for_kind(ReminderKind::HourBefore, now).contains(ts));
        assert!(!ReminderWindow::for_kind(ReminderKind::DayBefore, now).contains(ts));
    }
}
