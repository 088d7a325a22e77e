//! Availability windows and the slots derived from them

use std::convert::TryFrom;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub type AvailabilityId = i64;

pub const MIN_SLOT_MINUTES: u32 = 15;
pub const MAX_SLOT_MINUTES: u32 = 120;
const DEFAULT_SLOT_MINUTES: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub fn of(date: NaiveDate) -> Self {
        date.weekday().into()
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
            Weekday::Sun => DayOfWeek::Sunday,
        }
    }
}

/// Which dates a window applies to. Exactly one form, by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Recurrence {
    Weekly(DayOfWeek),
    Once(NaiveDate),
}

impl Recurrence {
    pub fn applies_to(&self, date: NaiveDate) -> bool {
        match self {
            Recurrence::Weekly(day) => *day == DayOfWeek::of(date),
            Recurrence::Once(specific) => *specific == date,
        }
    }
}

/// A doctor-declared time range from which slots are cut
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "AvailabilityWire", into = "AvailabilityWire")]
pub struct Availability {
    pub id: AvailabilityId,
    pub doctor_id: i64,
    pub recurrence: Recurrence,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    /// Minutes
    pub slot_duration: u32,
    pub available: bool,
    pub notes: Option<String>,
}

/// A new or edited window, validated before it is sent
#[derive(Debug, Clone, PartialEq)]
pub struct AvailabilityDraft {
    pub recurrence: Recurrence,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub slot_duration: u32,
    pub available: bool,
    pub notes: Option<String>,
}

impl AvailabilityDraft {
    pub fn new(recurrence: Recurrence, start_time: NaiveTime, end_time: NaiveTime) -> Self {
        Self {
            recurrence,
            start_time,
            end_time,
            slot_duration: DEFAULT_SLOT_MINUTES,
            available: true,
            notes: None,
        }
    }

    pub fn slot_duration(mut self, minutes: u32) -> Self {
        self.slot_duration = minutes;
        self
    }

    pub fn available(mut self, available: bool) -> Self {
        self.available = available;
        self
    }

    pub fn notes(mut self, notes: &str) -> Self {
        self.notes = Some(notes.to_string());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.start_time >= self.end_time {
            return Err(Error::validation("start time must be before end time"));
        }
        if !(MIN_SLOT_MINUTES..=MAX_SLOT_MINUTES).contains(&self.slot_duration) {
            return Err(Error::validation(format!(
                "slot duration must be between {} and {} minutes",
                MIN_SLOT_MINUTES, MAX_SLOT_MINUTES
            )));
        }
        let window = (self.end_time - self.start_time).num_seconds();
        if window % (i64::from(self.slot_duration) * 60) != 0 {
            return Err(Error::validation(format!(
                "a {}-minute slot does not divide the {}-{} window evenly",
                self.slot_duration,
                self.start_time.format("%H:%M"),
                self.end_time.format("%H:%M")
            )));
        }
        Ok(())
    }

    pub(crate) fn into_wire(self, doctor_id: i64, id: Option<AvailabilityId>) -> AvailabilityWire {
        let (day_of_week, specific_date) = split(self.recurrence);
        AvailabilityWire {
            id,
            doctor_id,
            day_of_week,
            specific_date,
            start_time: self.start_time,
            end_time: self.end_time,
            slot_duration: self.slot_duration,
            available: self.available,
            notes: self.notes,
        }
    }
}

fn split(recurrence: Recurrence) -> (Option<DayOfWeek>, Option<NaiveDate>) {
    match recurrence {
        Recurrence::Weekly(day) => (Some(day), None),
        Recurrence::Once(date) => (None, Some(date)),
    }
}

fn default_slot_duration() -> u32 {
    DEFAULT_SLOT_MINUTES
}

fn default_available() -> bool {
    true
}

/// The backend's shape: two nullable fields for the recurrence
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AvailabilityWire {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<AvailabilityId>,
    doctor_id: i64,
    #[serde(default)]
    day_of_week: Option<DayOfWeek>,
    #[serde(default)]
    specific_date: Option<NaiveDate>,
    #[serde(with = "clock")]
    start_time: NaiveTime,
    #[serde(with = "clock")]
    end_time: NaiveTime,
    #[serde(default = "default_slot_duration")]
    slot_duration: u32,
    #[serde(default = "default_available")]
    available: bool,
    #[serde(default)]
    notes: Option<String>,
}

impl TryFrom<AvailabilityWire> for Availability {
    type Error = String;

    fn try_from(wire: AvailabilityWire) -> std::result::Result<Self, Self::Error> {
        let recurrence = match (wire.day_of_week, wire.specific_date) {
            (Some(day), None) => Recurrence::Weekly(day),
            (None, Some(date)) => Recurrence::Once(date),
            (Some(_), Some(_)) => {
                return Err("availability has both dayOfWeek and specificDate".to_string())
            }
            (None, None) => {
                return Err("availability has neither dayOfWeek nor specificDate".to_string())
            }
        };
        Ok(Self {
            id: wire.id.ok_or_else(|| "availability has no id".to_string())?,
            doctor_id: wire.doctor_id,
            recurrence,
            start_time: wire.start_time,
            end_time: wire.end_time,
            slot_duration: wire.slot_duration,
            available: wire.available,
            notes: wire.notes,
        })
    }
}

impl From<Availability> for AvailabilityWire {
    fn from(availability: Availability) -> Self {
        let (day_of_week, specific_date) = split(availability.recurrence);
        Self {
            id: Some(availability.id),
            doctor_id: availability.doctor_id,
            day_of_week,
            specific_date,
            start_time: availability.start_time,
            end_time: availability.end_time,
            slot_duration: availability.slot_duration,
            available: availability.available,
            notes: availability.notes,
        }
    }
}

/// `HH:MM` on the way out; `HH:MM` or `HH:MM:SS[.f]` on the way in
mod clock {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, "%H:%M:%S%.f")
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M"))
            .map_err(serde::de::Error::custom)
    }
}

/// A fixed-length bookable interval. Always starts before it ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "SlotBounds")]
pub struct Slot {
    pub(crate) start_time: NaiveDateTime,
    pub(crate) end_time: NaiveDateTime,
}

impl Slot {
    pub fn new(start_time: NaiveDateTime, end_time: NaiveDateTime) -> Result<Self> {
        if start_time >= end_time {
            return Err(Error::validation("slot must start before it ends"));
        }
        Ok(Self {
            start_time,
            end_time,
        })
    }

    pub fn start_time(&self) -> NaiveDateTime {
        self.start_time
    }

    pub fn end_time(&self) -> NaiveDateTime {
        self.end_time
    }

    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SlotBounds {
    start_time: NaiveDateTime,
    end_time: NaiveDateTime,
}

impl TryFrom<SlotBounds> for Slot {
    type Error = String;

    fn try_from(bounds: SlotBounds) -> std::result::Result<Self, Self::Error> {
        Slot::new(bounds.start_time, bounds.end_time).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn weekly_recurrence_matches_weekday() {
        // 2024-06-03 is a Monday
        let monday = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        assert!(Recurrence::Weekly(DayOfWeek::Monday).applies_to(monday));
        assert!(!Recurrence::Weekly(DayOfWeek::Tuesday).applies_to(monday));
        assert!(Recurrence::Once(monday).applies_to(monday));
        assert!(!Recurrence::Once(monday.succ_opt().unwrap()).applies_to(monday));
    }

    #[test]
    fn inverted_slot_is_rejected_on_every_path() {
        let nine = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap().and_time(hm(9, 0));
        assert!(Slot::new(nine, nine).is_err());

        let parsed: std::result::Result<Slot, _> = serde_json::from_value(json!({
            "startTime": "2024-06-03T09:20:00",
            "endTime": "2024-06-03T09:00:00"
        }));
        assert!(parsed.is_err());

        let slot: Slot = serde_json::from_value(json!({
            "startTime": "2024-06-03T09:00:00",
            "endTime": "2024-06-03T09:20:00"
        }))
        .unwrap();
        assert_eq!(slot.start_time(), nine);
        assert_eq!(slot.duration(), Duration::minutes(20));
    }

    #[test]
    fn wire_requires_exactly_one_recurrence() {
        let both = json!({
            "id": 1, "doctorId": 2, "dayOfWeek": "MONDAY", "specificDate": "2024-06-03",
            "startTime": "09:00", "endTime": "10:00", "slotDuration": 20
        });
        assert!(serde_json::from_value::<Availability>(both).is_err());

        let neither = json!({
            "id": 1, "doctorId": 2, "startTime": "09:00", "endTime": "10:00"
        });
        assert!(serde_json::from_value::<Availability>(neither).is_err());

        let weekly: Availability = serde_json::from_value(json!({
            "id": 1, "doctorId": 2, "dayOfWeek": "MONDAY",
            "startTime": "09:00:00", "endTime": "10:00:00", "slotDuration": 20
        }))
        .unwrap();
        assert_eq!(weekly.recurrence, Recurrence::Weekly(DayOfWeek::Monday));
        assert!(weekly.available);
        assert_eq!(weekly.start_time, hm(9, 0));
    }

    #[test]
    fn draft_serializes_in_backend_shape() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 5).unwrap();
        let wire = AvailabilityDraft::new(Recurrence::Once(date), hm(13, 0), hm(15, 0))
            .slot_duration(30)
            .into_wire(8, None);
        assert_eq!(
            serde_json::to_value(&wire).unwrap(),
            json!({
                "doctorId": 8,
                "dayOfWeek": null,
                "specificDate": "2024-06-05",
                "startTime": "13:00",
                "endTime": "15:00",
                "slotDuration": 30,
                "available": true,
                "notes": null
            })
        );
    }

    #[test]
    fn draft_validation() {
        let weekly = Recurrence::Weekly(DayOfWeek::Friday);
        assert!(AvailabilityDraft::new(weekly, hm(9, 0), hm(10, 0))
            .slot_duration(20)
            .validate()
            .is_ok());
        assert!(AvailabilityDraft::new(weekly, hm(10, 0), hm(9, 0))
            .validate()
            .is_err());
        assert!(AvailabilityDraft::new(weekly, hm(9, 0), hm(10, 0))
            .slot_duration(10)
            .validate()
            .is_err());
        assert!(AvailabilityDraft::new(weekly, hm(9, 0), hm(13, 0))
            .slot_duration(121)
            .validate()
            .is_err());
        // 50 minutes does not divide an hour
        assert!(AvailabilityDraft::new(weekly, hm(9, 0), hm(10, 0))
            .slot_duration(50)
            .validate()
            .is_err());
    }

    #[test]
    fn slot_rejects_empty_interval() {
        let at = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap().and_time(hm(9, 0));
        assert!(Slot::new(at, at).is_err());
        let slot = Slot::new(at, at + Duration::minutes(20)).unwrap();
        assert_eq!(slot.duration(), Duration::minutes(20));
    }
}
