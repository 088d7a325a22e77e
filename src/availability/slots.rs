//! Cutting availability windows into bookable slots

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate, NaiveTime};

use super::types::{Availability, Slot};
use crate::appointments::Appointment;

/// Split `[start, end)` on `date` into contiguous `minutes`-long slots.
///
/// A tail shorter than one slot is dropped.
pub fn partition(date: NaiveDate, start: NaiveTime, end: NaiveTime, minutes: u32) -> Vec<Slot> {
    if minutes == 0 || start >= end {
        return Vec::new();
    }
    let step = Duration::minutes(i64::from(minutes));
    let count = (end - start).num_seconds() / step.num_seconds();
    let origin = date.and_time(start);

    (0..count)
        .map(|i| {
            let start_time = origin + step * i as i32;
            Slot {
                start_time,
                end_time: start_time + step,
            }
        })
        .collect()
}

/// Bookable slots for `date`: windows that apply and are open, unioned by
/// start time, minus anything overlapping a non-cancelled appointment.
/// Sorted ascending.
pub fn resolve(date: NaiveDate, windows: &[Availability], booked: &[Appointment]) -> Vec<Slot> {
    let mut by_start: BTreeMap<_, Slot> = BTreeMap::new();
    for window in windows
        .iter()
        .filter(|w| w.available && w.recurrence.applies_to(date))
    {
        for slot in partition(date, window.start_time, window.end_time, window.slot_duration) {
            by_start.entry(slot.start_time).or_insert(slot);
        }
    }

    by_start
        .into_values()
        .filter(|slot| {
            !booked
                .iter()
                .any(|apt| apt.blocks_slot() && apt.overlaps(slot.start_time, slot.end_time))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::availability::types::{DayOfWeek, Recurrence};
    use serde_json::json;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()
    }

    fn window(id: i64, recurrence: Recurrence, start: NaiveTime, end: NaiveTime, minutes: u32) -> Availability {
        Availability {
            id,
            doctor_id: 1,
            recurrence,
            start_time: start,
            end_time: end,
            slot_duration: minutes,
            available: true,
            notes: None,
        }
    }

    fn booked(start: &str, end: &str, status: &str) -> Appointment {
        serde_json::from_value(json!({
            "id": 1, "doctorId": 1, "patientId": 2,
            "startTime": start, "endTime": end,
            "reason": "Checkup", "status": status
        }))
        .unwrap()
    }

    #[test]
    fn monday_morning_hour_in_twenty_minute_slots() {
        let slots = partition(monday(), hm(9, 0), hm(10, 0), 20);
        let bounds: Vec<_> = slots
            .iter()
            .map(|s| (s.start_time.time(), s.end_time.time()))
            .collect();
        assert_eq!(
            bounds,
            vec![(hm(9, 0), hm(9, 20)), (hm(9, 20), hm(9, 40)), (hm(9, 40), hm(10, 0))]
        );
    }

    #[test]
    fn slot_count_is_floor_of_window_over_duration() {
        for minutes in [15u32, 20, 25, 30, 45, 50, 60, 90, 120] {
            for (start, end) in [(hm(8, 0), hm(12, 0)), (hm(9, 10), hm(10, 55)), (hm(13, 0), hm(13, 40))] {
                let slots = partition(monday(), start, end, minutes);
                let window = (end - start).num_minutes();
                assert_eq!(slots.len() as i64, window / i64::from(minutes));
                if let Some(first) = slots.first() {
                    assert_eq!(first.start_time.time(), start);
                }
                for pair in slots.windows(2) {
                    assert_eq!(pair[0].end_time, pair[1].start_time);
                }
                for slot in &slots {
                    assert!(slot.end_time.time() <= end);
                    assert_eq!(slot.duration(), Duration::minutes(i64::from(minutes)));
                }
            }
        }
    }

    #[test]
    fn degenerate_windows_yield_nothing() {
        assert!(partition(monday(), hm(10, 0), hm(9, 0), 30).is_empty());
        assert!(partition(monday(), hm(9, 0), hm(9, 10), 15).is_empty());
        assert!(partition(monday(), hm(9, 0), hm(10, 0), 0).is_empty());
    }

    #[test]
    fn overlapping_windows_are_unioned_and_sorted() {
        let windows = vec![
            window(2, Recurrence::Once(monday()), hm(9, 30), hm(10, 30), 30),
            window(1, Recurrence::Weekly(DayOfWeek::Monday), hm(9, 0), hm(10, 0), 30),
            window(3, Recurrence::Weekly(DayOfWeek::Tuesday), hm(7, 0), hm(8, 0), 30),
        ];
        let starts: Vec<_> = resolve(monday(), &windows, &[])
            .iter()
            .map(|s| s.start_time.time())
            .collect();
        assert_eq!(starts, vec![hm(9, 0), hm(9, 30), hm(10, 0)]);
    }

    #[test]
    fn closed_windows_are_skipped() {
        let mut closed = window(1, Recurrence::Weekly(DayOfWeek::Monday), hm(9, 0), hm(10, 0), 30);
        closed.available = false;
        assert!(resolve(monday(), &[closed], &[]).is_empty());
    }

    #[test]
    fn booked_slots_are_excluded_unless_cancelled() {
        let windows = vec![window(1, Recurrence::Weekly(DayOfWeek::Monday), hm(9, 0), hm(10, 0), 20)];
        let taken = booked("2024-06-03T09:20:00", "2024-06-03T09:40:00", "SCHEDULED");
        let dropped = booked("2024-06-03T09:40:00", "2024-06-03T10:00:00", "CANCELLED");

        let starts: Vec<_> = resolve(monday(), &windows, &[taken, dropped])
            .iter()
            .map(|s| s.start_time.time())
            .collect();
        assert_eq!(starts, vec![hm(9, 0), hm(9, 40)]);
    }

    #[test]
    fn partial_overlap_consumes_slot() {
        let windows = vec![window(1, Recurrence::Weekly(DayOfWeek::Monday), hm(9, 0), hm(10, 0), 20)];
        // a 30-minute appointment starting at 09:00 also reaches into 09:20-09:40
        let long = booked("2024-06-03T09:00:00", "2024-06-03T09:30:00", "IN_PROGRESS");
        let starts: Vec<_> = resolve(monday(), &windows, &[long])
            .iter()
            .map(|s| s.start_time.time())
            .collect();
        assert_eq!(starts, vec![hm(9, 40)]);
    }
}
