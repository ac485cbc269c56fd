//! Pure scheduling logic: overlap detection for playlist schedules and
//! resolution of the schedule active at a given weekday/time-of-day.
//!
//! All comparisons are time-of-day only; the caller supplies the weekday
//! and clock reading (host local time in practice). Weekday convention is
//! Monday = 0 .. Sunday = 6 throughout.

use crate::models::PlaylistSchedule;
use chrono::{NaiveTime, Weekday};

/// True if the two day-flag vectors share at least one enabled day.
fn days_intersect(a: &[bool; 7], b: &[bool; 7]) -> bool {
    a.iter().zip(b.iter()).any(|(x, y)| *x && *y)
}

/// Checks a candidate time window against existing schedules.
///
/// Only existing schedules flagged active are considered. Two windows
/// conflict when `start_a < end_b && end_a > start_b` AND they share at
/// least one weekday. `exclude_id` skips the schedule being updated so it
/// does not collide with itself.
pub fn has_overlap(
    existing: &[PlaylistSchedule],
    start: NaiveTime,
    end: NaiveTime,
    days: &[bool; 7],
    exclude_id: Option<i32>,
) -> bool {
    existing
        .iter()
        .filter(|s| s.is_active)
        .filter(|s| exclude_id != Some(s.id))
        .any(|s| start < s.end_time && end > s.start_time && days_intersect(days, &s.day_flags()))
}

/// Returns the schedule active at the given weekday and time-of-day.
///
/// A schedule matches when it is active, its flag for the weekday is set,
/// and `start_time <= at <= end_time` (both bounds inclusive, so a schedule
/// still counts as active at its exact end instant). If several schedules
/// match - a state the write-time overlap check should have prevented -
/// the first match in slice order is returned; callers must not rely on
/// which one that is.
pub fn resolve_active(
    schedules: &[PlaylistSchedule],
    weekday: Weekday,
    at: NaiveTime,
) -> Option<&PlaylistSchedule> {
    let day_index = weekday.num_days_from_monday() as usize;

    schedules
        .iter()
        .filter(|s| s.is_active)
        .find(|s| s.day_flags()[day_index] && s.start_time <= at && at <= s.end_time)
}

/// Parses a time-of-day from admin input, accepting "HH:MM" or "HH:MM:SS".
pub fn parse_time_of_day(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule(
        id: i32,
        start: &str,
        end: &str,
        days: [bool; 7],
        is_active: bool,
    ) -> PlaylistSchedule {
        PlaylistSchedule {
            id,
            playlist_id: 1,
            start_time: parse_time_of_day(start).unwrap(),
            end_time: parse_time_of_day(end).unwrap(),
            monday: days[0],
            tuesday: days[1],
            wednesday: days[2],
            thursday: days[3],
            friday: days[4],
            saturday: days[5],
            sunday: days[6],
            is_active,
        }
    }

    const WEEKDAYS: [bool; 7] = [true, true, true, true, true, false, false];
    const WEEKEND: [bool; 7] = [false, false, false, false, false, true, true];

    #[test]
    fn overlapping_window_on_shared_day_conflicts() {
        let existing = vec![schedule(1, "09:00", "17:00", WEEKDAYS, true)];

        let t = |s| parse_time_of_day(s).unwrap();
        assert!(has_overlap(
            &existing,
            t("16:00"),
            t("18:00"),
            &WEEKDAYS,
            None
        ));
    }

    #[test]
    fn overlapping_window_on_disjoint_days_is_fine() {
        let existing = vec![schedule(1, "09:00", "17:00", WEEKDAYS, true)];

        let t = |s| parse_time_of_day(s).unwrap();
        assert!(!has_overlap(
            &existing,
            t("09:00"),
            t("17:00"),
            &WEEKEND,
            None
        ));
    }

    #[test]
    fn touching_windows_do_not_conflict() {
        // 09:00-12:00 followed by 12:00-17:00: end_a == start_b is allowed.
        let existing = vec![schedule(1, "09:00", "12:00", WEEKDAYS, true)];

        let t = |s| parse_time_of_day(s).unwrap();
        assert!(!has_overlap(
            &existing,
            t("12:00"),
            t("17:00"),
            &WEEKDAYS,
            None
        ));
    }

    #[test]
    fn inactive_schedules_are_ignored_by_overlap_check() {
        let existing = vec![schedule(1, "09:00", "17:00", WEEKDAYS, false)];

        let t = |s| parse_time_of_day(s).unwrap();
        assert!(!has_overlap(
            &existing,
            t("10:00"),
            t("11:00"),
            &WEEKDAYS,
            None
        ));
    }

    #[test]
    fn updated_schedule_does_not_collide_with_itself() {
        let existing = vec![schedule(7, "09:00", "17:00", WEEKDAYS, true)];

        let t = |s| parse_time_of_day(s).unwrap();
        assert!(!has_overlap(
            &existing,
            t("10:00"),
            t("16:00"),
            &WEEKDAYS,
            Some(7)
        ));
        assert!(has_overlap(
            &existing,
            t("10:00"),
            t("16:00"),
            &WEEKDAYS,
            None
        ));
    }

    #[test]
    fn resolve_picks_matching_schedule() {
        let schedules = vec![
            schedule(1, "09:00", "12:00", WEEKDAYS, true),
            schedule(2, "12:30", "17:00", WEEKDAYS, true),
        ];

        let hit = resolve_active(&schedules, Weekday::Mon, parse_time_of_day("13:00").unwrap());
        assert_eq!(hit.map(|s| s.id), Some(2));
    }

    #[test]
    fn resolve_returns_none_outside_any_window() {
        let schedules = vec![schedule(1, "09:00", "12:00", WEEKDAYS, true)];

        assert!(resolve_active(&schedules, Weekday::Mon, parse_time_of_day("12:15").unwrap())
            .is_none());
        // Right time, wrong day.
        assert!(resolve_active(&schedules, Weekday::Sat, parse_time_of_day("10:00").unwrap())
            .is_none());
    }

    #[test]
    fn resolve_bounds_are_inclusive() {
        let schedules = vec![schedule(1, "09:00", "12:00", WEEKDAYS, true)];

        let at_start = resolve_active(&schedules, Weekday::Tue, parse_time_of_day("09:00").unwrap());
        let at_end = resolve_active(&schedules, Weekday::Tue, parse_time_of_day("12:00").unwrap());
        assert!(at_start.is_some());
        assert!(at_end.is_some());
    }

    #[test]
    fn resolve_skips_inactive_schedules() {
        let schedules = vec![schedule(1, "09:00", "12:00", WEEKDAYS, false)];

        assert!(resolve_active(&schedules, Weekday::Mon, parse_time_of_day("10:00").unwrap())
            .is_none());
    }

    #[test]
    fn time_parsing_accepts_both_forms() {
        assert_eq!(
            parse_time_of_day("09:30"),
            NaiveTime::from_hms_opt(9, 30, 0)
        );
        assert_eq!(
            parse_time_of_day("09:30:15"),
            NaiveTime::from_hms_opt(9, 30, 15)
        );
        assert!(parse_time_of_day("25:00").is_none());
        assert!(parse_time_of_day("nonsense").is_none());
    }
}
