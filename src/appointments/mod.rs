//! Appointment lifecycle controller

mod lifecycle;
mod types;

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use log::{debug, info, warn};

use crate::auth::{require, Capability, Role, SessionStore};
use crate::availability::Slot;
use crate::error::{Error, Result};
use crate::fetch::Gateway;
use crate::tracker::{RequestTracker, Resolved};

pub use lifecycle::{allowed_transitions, check_transition, TRANSITIONS};
pub use types::*;

pub const REASON_MIN_CHARS: usize = 3;
pub const REASON_MAX_CHARS: usize = 255;
pub const NOTES_MAX_CHARS: usize = 1000;

fn validate_reason(reason: &str) -> Result<String> {
    let reason = reason.trim();
    let len = reason.chars().count();
    if len == 0 {
        return Err(Error::validation("a reason is required"));
    }
    if !(REASON_MIN_CHARS..=REASON_MAX_CHARS).contains(&len) {
        return Err(Error::validation(format!(
            "reason must be between {} and {} characters",
            REASON_MIN_CHARS, REASON_MAX_CHARS
        )));
    }
    Ok(reason.to_string())
}

fn validate_notes(notes: &str) -> Result<()> {
    if notes.chars().count() > NOTES_MAX_CHARS {
        return Err(Error::validation(format!(
            "notes cannot exceed {} characters",
            NOTES_MAX_CHARS
        )));
    }
    Ok(())
}

/// Enforces legal status transitions and who may trigger them.
///
/// Every state-changing call drops the cached copy and re-fetches, so reads
/// after a change never serve the old status.
#[derive(Clone)]
pub struct Appointments {
    gateway: Gateway,
    session: SessionStore,
    cache: Arc<RwLock<HashMap<AppointmentId, Appointment>>>,
    tracker: Arc<RequestTracker<AppointmentId>>,
}

impl Appointments {
    pub(crate) fn new(gateway: Gateway, session: SessionStore) -> Self {
        Self {
            gateway,
            session,
            cache: Arc::new(RwLock::new(HashMap::new())),
            tracker: Arc::new(RequestTracker::new()),
        }
    }

    /// Appointments visible to the caller's role
    pub async fn list(&self) -> Result<Vec<Appointment>> {
        let identity = self.session.require_identity()?;
        let path = match identity.role {
            Role::Admin => "/appointments",
            Role::Doctor => "/appointments/doctor",
            Role::Patient => "/appointments/patient",
        };
        self.gateway.get(path).execute_list().await
    }

    /// Fetch one appointment. A fetch overtaken by a newer one for the same id
    /// resolves as superseded and leaves the cache alone.
    pub async fn get(&self, id: AppointmentId) -> Result<Resolved<Appointment>> {
        let token = self.tracker.begin(id);
        let result = self
            .gateway
            .get(&format!("/appointments/{}", id))
            .execute::<Appointment>()
            .await;

        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        let current = self.tracker.is_current(&token);
        self.tracker.finish(&token);
        if !current {
            debug!("Dropping superseded fetch of appointment {}", id);
            return Ok(Resolved::Superseded);
        }
        match result {
            Ok(appointment) => {
                cache.insert(id, appointment.clone());
                Ok(Resolved::Current(appointment))
            }
            Err(e) => {
                if matches!(e, Error::NotFound(_)) {
                    cache.remove(&id);
                }
                Err(e)
            }
        }
    }

    /// The last fetched copy, without a network call
    pub fn cached(&self, id: AppointmentId) -> Option<Appointment> {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    /// Drop the cached copy; outstanding fetches for it become stale.
    pub fn invalidate(&self, id: AppointmentId) {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        self.tracker.forget(&id);
    }

    async fn refetch(&self, id: AppointmentId) -> Result<Appointment> {
        self.invalidate(id);
        match self.get(id).await? {
            Resolved::Current(appointment) => Ok(appointment),
            // someone else already asked again; this answer is still fresh
            Resolved::Superseded => self
                .gateway
                .get(&format!("/appointments/{}", id))
                .execute()
                .await,
        }
    }

    async fn known(&self, id: AppointmentId) -> Result<Appointment> {
        match self.cached(id) {
            Some(appointment) => Ok(appointment),
            None => self.refetch(id).await,
        }
    }

    /// The statuses the caller may move `appointment` to
    pub fn allowed_transitions(&self, appointment: &Appointment) -> Vec<AppointmentStatus> {
        match self.session.identity() {
            Some(identity) => allowed_transitions(appointment, &identity),
            None => Vec::new(),
        }
    }

    /// Book `slot` with `doctor_id`. Patients only.
    pub async fn create(
        &self,
        doctor_id: i64,
        slot: Option<&Slot>,
        reason: &str,
        notes: Option<&str>,
    ) -> Result<Appointment> {
        let identity = self.session.require_identity()?;
        require(&identity, Capability::BookAppointment)?;
        let slot = slot.ok_or(Error::SlotRequired)?;
        let reason = validate_reason(reason)?;
        if let Some(notes) = notes {
            validate_notes(notes)?;
        }

        let request = NewAppointment {
            doctor_id,
            patient_id: identity.patient_id(),
            appointment_date_time: slot.start_time,
            end_date_time: slot.end_time,
            reason,
            notes: notes.map(str::to_string),
        };
        let created: Appointment = self
            .gateway
            .post("/appointments")
            .json(&request)?
            .execute()
            .await
            .map_err(|e| {
                if matches!(e, Error::Conflict(_)) {
                    info!(
                        "Slot {} with doctor {} was taken concurrently",
                        slot.start_time, doctor_id
                    );
                }
                e
            })?;

        info!("Booked appointment {} with doctor {}", created.id, doctor_id);
        match self.refetch(created.id).await {
            Ok(appointment) => Ok(appointment),
            Err(Error::Unauthorized) => Err(Error::Unauthorized),
            Err(e) => {
                // the booking itself went through
                warn!("Could not re-read appointment {}: {}", created.id, e);
                Ok(created)
            }
        }
    }

    /// Move an appointment to `status`.
    ///
    /// The edge and the caller's role are checked against the last known status
    /// before anything is sent. A backend rejection (typically a concurrent
    /// change) is returned as-is, never retried.
    pub async fn update_status(
        &self,
        id: AppointmentId,
        status: AppointmentStatus,
    ) -> Result<Appointment> {
        let identity = self.session.require_identity()?;
        let current = self.known(id).await?;
        check_transition(&current, status, &identity)?;

        let sent = self
            .gateway
            .put(&format!("/appointments/{}/status", id))
            .json(&StatusUpdate { status })?
            .execute_empty()
            .await;
        if let Err(e) = sent {
            warn!(
                "Status change {} -> {} on appointment {} failed: {}",
                current.status, status, id, e
            );
            self.invalidate(id);
            return Err(e);
        }

        info!("Appointment {} moved {} -> {}", id, current.status, status);
        self.refetch(id).await
    }

    /// Shorthand for moving to `CANCELLED`
    pub async fn cancel(&self, id: AppointmentId) -> Result<Appointment> {
        self.update_status(id, AppointmentStatus::Cancelled).await
    }

    /// Replace the notes. Doctors only; allowed at any status.
    pub async fn update_notes(&self, id: AppointmentId, notes: &str) -> Result<Appointment> {
        let identity = self.session.require_identity()?;
        require(&identity, Capability::EditAppointmentNotes)?;
        validate_notes(notes)?;

        let sent = self
            .gateway
            .put(&format!("/appointments/{}", id))
            .json(&NotesUpdate {
                notes: notes.to_string(),
            })?
            .execute_empty()
            .await;
        if let Err(e) = sent {
            self.invalidate(id);
            return Err(e);
        }
        self.refetch(id).await
    }
}
