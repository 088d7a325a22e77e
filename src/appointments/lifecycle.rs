//! Status transition table and who may drive each edge

use log::warn;

use super::types::{Appointment, AppointmentStatus};
use crate::auth::{Capability, Identity};
use crate::error::{Error, Result};

use AppointmentStatus::*;

/// Every permitted `(from, to)` edge. Anything else is rejected locally.
pub const TRANSITIONS: [(AppointmentStatus, AppointmentStatus); 4] = [
    (Scheduled, InProgress),
    (Scheduled, Cancelled),
    (InProgress, Completed),
    (InProgress, Cancelled),
];

impl AppointmentStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Completed | Cancelled)
    }

    pub fn can_transition_to(self, next: AppointmentStatus) -> bool {
        TRANSITIONS.contains(&(self, next))
    }

    /// Statuses reachable in one step
    pub fn next_statuses(self) -> Vec<AppointmentStatus> {
        TRANSITIONS
            .iter()
            .filter(|(from, _)| *from == self)
            .map(|(_, to)| *to)
            .collect()
    }
}

/// Validate `appointment.status -> to` for `identity`.
///
/// The edge is checked before the role, so an illegal edge reports
/// `IllegalTransition` whoever asks.
pub fn check_transition(
    appointment: &Appointment,
    to: AppointmentStatus,
    identity: &Identity,
) -> Result<()> {
    let from = appointment.status;
    if !from.can_transition_to(to) {
        warn!(
            "Rejected transition {} -> {} on appointment {}",
            from, to, appointment.id
        );
        return Err(Error::IllegalTransition { from, to });
    }

    let role = identity.role;
    if role.can(Capability::DriveAppointmentLifecycle) {
        return Ok(());
    }

    if role.can(Capability::CancelOwnAppointment) && from == Scheduled && to == Cancelled {
        if appointment.patient_id == identity.patient_id() {
            return Ok(());
        }
        return Err(Error::forbidden(format!(
            "appointment {} belongs to another patient",
            appointment.id
        )));
    }

    Err(Error::forbidden(format!(
        "role {:?} may not move an appointment from {} to {}",
        role, from, to
    )))
}

/// The statuses `identity` may move `appointment` to. Drives button gating.
pub fn allowed_transitions(appointment: &Appointment, identity: &Identity) -> Vec<AppointmentStatus> {
    appointment
        .status
        .next_statuses()
        .into_iter()
        .filter(|to| check_transition(appointment, *to, identity).is_ok())
        .collect()
}
