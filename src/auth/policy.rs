//! Role-derived capabilities

use super::types::{Identity, Role};
use crate::error::{Error, Result};

/// A permission derived from a [`Role`]. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    BookAppointment,
    CancelOwnAppointment,
    ManageAvailability,
    ViewAllAppointments,
    /// Start, complete or cancel any appointment
    DriveAppointmentLifecycle,
    EditAppointmentNotes,
}

impl Capability {
    pub const ALL: [Capability; 6] = [
        Capability::BookAppointment,
        Capability::CancelOwnAppointment,
        Capability::ManageAvailability,
        Capability::ViewAllAppointments,
        Capability::DriveAppointmentLifecycle,
        Capability::EditAppointmentNotes,
    ];
}

impl Role {
    /// Capability lookup. Adding a role means extending this match.
    pub fn can(self, capability: Capability) -> bool {
        use Capability::*;
        match self {
            Role::Patient => matches!(capability, BookAppointment | CancelOwnAppointment),
            Role::Doctor => matches!(
                capability,
                ManageAvailability | DriveAppointmentLifecycle | EditAppointmentNotes
            ),
            Role::Admin => matches!(capability, ViewAllAppointments | DriveAppointmentLifecycle),
        }
    }

    /// Every capability this role holds
    pub fn capabilities(self) -> Vec<Capability> {
        Capability::ALL
            .into_iter()
            .filter(|c| self.can(*c))
            .collect()
    }
}

/// Fail with `Forbidden` unless the identity's role grants `capability`.
pub fn require(identity: &Identity, capability: Capability) -> Result<()> {
    if identity.role.can(capability) {
        Ok(())
    } else {
        log::warn!(
            "User {} ({:?}) lacks capability {:?}",
            identity.id,
            identity.role,
            capability
        );
        Err(Error::forbidden(format!(
            "role {:?} may not {:?}",
            identity.role, capability
        )))
    }
}
