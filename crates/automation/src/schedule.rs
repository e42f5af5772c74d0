//! Weekly slot arithmetic for the detector.
//!
//! Slots are read as UTC; the stored `timezone` column is informational.

use chrono::{DateTime, Datelike, Duration, Utc};

use crate::models::ScheduleSlot;

/// Minutes to wait when a platform has no slots configured.
pub const NO_SLOTS_DELAY_MINS: i64 = 15;
/// Minutes to wait when every slot in the coming week is taken.
pub const ALL_TAKEN_DELAY_MINS: i64 = 60;
/// Minutes to wait when the slots could not be read.
pub const LOOKUP_ERROR_DELAY_MINS: i64 = 30;

/// Next time `slot` comes around, strictly after `now` when it is today.
///
/// `None` for a slot whose time of day does not exist (e.g. hour 25).
pub fn next_occurrence(slot: ScheduleSlot, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let target_today = now
        .date_naive()
        .and_hms_opt(slot.hour, slot.minute, 0)?
        .and_utc();

    let today = now.weekday().num_days_from_sunday() as i64;
    let mut days = slot.day_of_week as i64 - today;
    if days == 0 && target_today <= now {
        days = 7;
    } else if days < 0 {
        days += 7;
    }

    Some(target_today + Duration::days(days))
}

/// Next occurrence of every slot, in day/hour/minute order of the slots.
pub fn candidate_times(slots: &[ScheduleSlot], now: DateTime<Utc>) -> Vec<DateTime<Utc>> {
    let mut ordered = slots.to_vec();
    ordered.sort();
    ordered
        .into_iter()
        .filter(|s| s.day_of_week < 7)
        .filter_map(|s| next_occurrence(s, now))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    // Wednesday 2025-01-15 12:00 UTC.
    fn wednesday_noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn later_today_stays_today() {
        let at = next_occurrence(ScheduleSlot::new(3, 18, 30), wednesday_noon()).unwrap();
        assert_eq!(at, Utc.with_ymd_and_hms(2025, 1, 15, 18, 30, 0).unwrap());
    }

    #[test]
    fn passed_today_moves_to_next_week() {
        let at = next_occurrence(ScheduleSlot::new(3, 9, 0), wednesday_noon()).unwrap();
        assert_eq!(at, Utc.with_ymd_and_hms(2025, 1, 22, 9, 0, 0).unwrap());

        let exactly_now = next_occurrence(ScheduleSlot::new(3, 12, 0), wednesday_noon()).unwrap();
        assert_eq!(exactly_now, Utc.with_ymd_and_hms(2025, 1, 22, 12, 0, 0).unwrap());
    }

    #[test]
    fn earlier_weekday_wraps_around() {
        let monday = next_occurrence(ScheduleSlot::new(1, 8, 0), wednesday_noon()).unwrap();
        assert_eq!(monday, Utc.with_ymd_and_hms(2025, 1, 20, 8, 0, 0).unwrap());

        let friday = next_occurrence(ScheduleSlot::new(5, 8, 0), wednesday_noon()).unwrap();
        assert_eq!(friday, Utc.with_ymd_and_hms(2025, 1, 17, 8, 0, 0).unwrap());
    }

    #[test]
    fn candidates_follow_slot_order_and_skip_invalid_slots() {
        let slots = [
            ScheduleSlot::new(5, 8, 0),
            ScheduleSlot::new(1, 8, 0),
            ScheduleSlot::new(2, 25, 0),
            ScheduleSlot::new(9, 8, 0),
        ];
        let times = candidate_times(&slots, wednesday_noon());
        assert_eq!(
            times,
            vec![
                Utc.with_ymd_and_hms(2025, 1, 20, 8, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2025, 1, 17, 8, 0, 0).unwrap(),
            ]
        );
    }
}
