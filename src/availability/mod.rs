//! Availability windows and slot resolution
//!
//! The slot list is advisory: the backend decides whether a booking wins. A
//! booking that loses a race surfaces as `Conflict`, and the view re-lists.

mod slots;
mod types;

use std::sync::{Arc, PoisonError, RwLock};

use chrono::NaiveDate;
use log::{debug, warn};

use crate::appointments::Appointment;
use crate::auth::{require, Capability, SessionStore};
use crate::error::{Error, Result};
use crate::fetch::Gateway;
use crate::tracker::{RequestTracker, Resolved};

pub use slots::{partition, resolve};
pub use types::*;
use types::AvailabilityWire;

/// The `(doctor, date)` pair a slot list belongs to
pub type SlotKey = (i64, NaiveDate);

/// The slot list currently on display
#[derive(Debug, Clone, PartialEq)]
pub struct SlotView {
    pub doctor_id: i64,
    pub date: NaiveDate,
    pub slots: Vec<Slot>,
}

/// Slot resolution and doctor-scoped availability management
#[derive(Clone)]
pub struct AvailabilityClient {
    gateway: Gateway,
    session: SessionStore,
    tracker: Arc<RequestTracker<SlotKey>>,
    displayed: Arc<RwLock<Option<SlotView>>>,
}

impl AvailabilityClient {
    pub(crate) fn new(gateway: Gateway, session: SessionStore) -> Self {
        Self {
            gateway,
            session,
            tracker: Arc::new(RequestTracker::new()),
            displayed: Arc::new(RwLock::new(None)),
        }
    }

    /// Bookable slots for `doctor_id` on `date`.
    ///
    /// Starting a new listing supersedes any outstanding one; a superseded
    /// listing neither changes [`displayed`](Self::displayed) nor reports its
    /// errors.
    pub async fn list_slots(&self, doctor_id: i64, date: NaiveDate) -> Result<Resolved<Vec<Slot>>> {
        let token = self.tracker.begin((doctor_id, date));

        let fetched = tokio::try_join!(
            self.availabilities_for(doctor_id),
            self.booked(doctor_id, date)
        );

        let mut displayed = self.displayed.write().unwrap_or_else(PoisonError::into_inner);
        let focused = self.tracker.is_focused(&token);
        self.tracker.finish(&token);
        if !focused {
            debug!(
                "Dropping slot list for doctor {} on {}: superseded",
                doctor_id, date
            );
            return Ok(Resolved::Superseded);
        }

        let (windows, booked) = fetched?;
        let slots = resolve(date, &windows, &booked);
        *displayed = Some(SlotView {
            doctor_id,
            date,
            slots: slots.clone(),
        });
        Ok(Resolved::Current(slots))
    }

    /// The most recent current slot list, if any
    pub fn displayed(&self) -> Option<SlotView> {
        self.displayed
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Forget the displayed list for `doctor_id`, cancelling interest in any
    /// listing still in flight for that doctor's current key.
    pub fn invalidate_doctor(&self, doctor_id: i64) {
        let mut displayed = self.displayed.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(view) = displayed.as_ref().filter(|v| v.doctor_id == doctor_id) {
            self.tracker.forget(&(view.doctor_id, view.date));
            *displayed = None;
        }
    }

    /// All windows a doctor has published.
    ///
    /// A record that does not describe exactly one recurrence is skipped, so one
    /// bad window cannot hide the doctor's other slots.
    pub async fn availabilities_for(&self, doctor_id: i64) -> Result<Vec<Availability>> {
        let records: Vec<AvailabilityWire> = self
            .gateway
            .get("/availabilities")
            .query("doctorId", doctor_id)
            .execute_list()
            .await?;
        Ok(records
            .into_iter()
            .filter_map(|record| match Availability::try_from(record) {
                Ok(window) => Some(window),
                Err(e) => {
                    warn!("Skipping availability of doctor {}: {}", doctor_id, e);
                    None
                }
            })
            .filter(|w| w.doctor_id == doctor_id)
            .collect())
    }

    async fn booked(&self, doctor_id: i64, date: NaiveDate) -> Result<Vec<Appointment>> {
        self.gateway
            .get(&format!("/appointments/doctor/{}", doctor_id))
            .query("date", date.format("%Y-%m-%d"))
            .execute_list()
            .await
    }

    /// The caller's own windows (doctors only)
    pub async fn my_availabilities(&self) -> Result<Vec<Availability>> {
        let identity = self.session.require_identity()?;
        require(&identity, Capability::ManageAvailability)?;
        self.availabilities_for(identity.doctor_id()).await
    }

    /// Publish a new window for the calling doctor
    pub async fn create_availability(&self, draft: AvailabilityDraft) -> Result<Availability> {
        let identity = self.session.require_identity()?;
        require(&identity, Capability::ManageAvailability)?;
        draft.validate()?;

        let doctor_id = identity.doctor_id();
        let created: Availability = self
            .gateway
            .post("/availabilities")
            .json(&draft.into_wire(doctor_id, None))?
            .execute()
            .await?;
        self.invalidate_doctor(doctor_id);
        Ok(created)
    }

    /// Replace one of the caller's windows
    pub async fn update_availability(
        &self,
        id: AvailabilityId,
        draft: AvailabilityDraft,
    ) -> Result<Availability> {
        let identity = self.session.require_identity()?;
        require(&identity, Capability::ManageAvailability)?;
        draft.validate()?;

        let doctor_id = identity.doctor_id();
        self.ensure_owned(id, doctor_id).await?;
        let updated: Availability = self
            .gateway
            .put(&format!("/availabilities/{}", id))
            .json(&draft.into_wire(doctor_id, Some(id)))?
            .execute()
            .await?;
        self.invalidate_doctor(doctor_id);
        Ok(updated)
    }

    /// Remove one of the caller's windows
    pub async fn delete_availability(&self, id: AvailabilityId) -> Result<()> {
        let identity = self.session.require_identity()?;
        require(&identity, Capability::ManageAvailability)?;

        let doctor_id = identity.doctor_id();
        self.ensure_owned(id, doctor_id).await?;
        self.gateway
            .delete(&format!("/availabilities/{}", id))
            .execute_empty()
            .await?;
        self.invalidate_doctor(doctor_id);
        Ok(())
    }

    async fn ensure_owned(&self, id: AvailabilityId, doctor_id: i64) -> Result<Availability> {
        let existing: Availability = self
            .gateway
            .get(&format!("/availabilities/{}", id))
            .execute()
            .await?;
        if existing.doctor_id != doctor_id {
            return Err(Error::forbidden(format!(
                "availability {} belongs to another doctor",
                id
            )));
        }
        Ok(existing)
    }
}
