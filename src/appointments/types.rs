//! Appointment records and request bodies

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub type AppointmentId = i64;

/// Lifecycle state of an appointment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "SCHEDULED",
            AppointmentStatus::InProgress => "IN_PROGRESS",
            AppointmentStatus::Completed => "COMPLETED",
            AppointmentStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An appointment as the backend reports it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    #[serde(alias = "appointmentId")]
    pub id: AppointmentId,
    pub doctor_id: i64,
    pub patient_id: i64,
    #[serde(alias = "appointmentDateTime")]
    pub start_time: NaiveDateTime,
    #[serde(alias = "endDateTime")]
    pub end_time: NaiveDateTime,
    pub reason: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub status: AppointmentStatus,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub updated_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub doctor_name: Option<String>,
    #[serde(default)]
    pub doctor_specialization: Option<String>,
    #[serde(default)]
    pub patient_name: Option<String>,
}

impl Appointment {
    /// Holds its time range against new bookings
    pub fn blocks_slot(&self) -> bool {
        self.status != AppointmentStatus::Cancelled
    }

    /// Half-open interval overlap with `[start, end)`
    pub fn overlaps(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        self.start_time < end && start < self.end_time
    }
}

/// `POST /appointments` body
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NewAppointment {
    pub doctor_id: i64,
    pub patient_id: i64,
    pub appointment_date_time: NaiveDateTime,
    pub end_date_time: NaiveDateTime,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// `PUT /appointments/:id/status` body
#[derive(Debug, Clone, Serialize)]
pub(crate) struct StatusUpdate {
    pub status: AppointmentStatus,
}

/// `PUT /appointments/:id` body for notes edits
#[derive(Debug, Clone, Serialize)]
pub(crate) struct NotesUpdate {
    pub notes: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_backend_field_names() {
        let apt: Appointment = serde_json::from_value(json!({
            "appointmentId": 11,
            "doctorId": 2,
            "patientId": 3,
            "appointmentDateTime": "2024-06-03T09:00:00",
            "endDateTime": "2024-06-03T09:30:00",
            "reason": "Checkup",
            "status": "IN_PROGRESS"
        }))
        .unwrap();
        assert_eq!(apt.id, 11);
        assert_eq!(apt.status, AppointmentStatus::InProgress);
        assert!(apt.notes.is_none());
    }

    #[test]
    fn cancelled_appointments_free_their_slot() {
        let mut apt: Appointment = serde_json::from_value(json!({
            "id": 1, "doctorId": 2, "patientId": 3,
            "startTime": "2024-06-03T09:00:00",
            "endTime": "2024-06-03T09:30:00",
            "reason": "Checkup", "status": "SCHEDULED"
        }))
        .unwrap();
        let at = |h, m| {
            chrono::NaiveDate::from_ymd_opt(2024, 6, 3)
                .unwrap()
                .and_hms_opt(h, m, 0)
                .unwrap()
        };
        assert!(apt.blocks_slot());
        assert!(apt.overlaps(at(9, 20), at(9, 40)));
        assert!(!apt.overlaps(at(9, 30), at(9, 50)));
        apt.status = AppointmentStatus::Cancelled;
        assert!(!apt.blocks_slot());
    }
}
