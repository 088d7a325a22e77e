//! medbook: client core for a medical appointment system
//!
//! Patients book slots against doctor-published availability, doctors manage
//! availability and drive appointment status, admins see everything. This crate
//! holds the parts with real consistency concerns: the session lifecycle that
//! gates every call, the appointment state machine, and slot resolution.
//! Rendering is left to whatever view layer calls into it.

pub mod appointments;
pub mod auth;
pub mod availability;
pub mod config;
pub mod doctors;
pub mod error;
pub mod fetch;
pub mod tracker;

use std::sync::Arc;

use crate::appointments::Appointments;
use crate::auth::{SessionState, SessionStore, TokenStorage};
use crate::availability::AvailabilityClient;
use crate::config::ClientOptions;
use crate::doctors::Doctors;
use crate::error::{Error, Result};
use crate::fetch::Gateway;

/// The main entry point for the medbook client
///
/// All handles share one session: a rejected token seen by any of them signs
/// every one of them out.
#[derive(Clone)]
pub struct MedBook {
    /// Backend base URL, e.g. `http://localhost:8080/api`
    pub url: String,
    /// Client options
    pub options: ClientOptions,
    gateway: Gateway,
    session: SessionStore,
    appointments: Appointments,
    availability: AvailabilityClient,
    doctors: Doctors,
}

impl MedBook {
    /// Create a new client
    ///
    /// # Example
    ///
    /// ```
    /// use medbook::MedBook;
    ///
    /// let client = MedBook::new("http://localhost:8080/api").unwrap();
    /// ```
    pub fn new(url: &str) -> Result<Self> {
        Self::new_with_options(url, ClientOptions::default())
    }

    /// Create a new client with custom options
    ///
    /// # Example
    ///
    /// ```
    /// use std::time::Duration;
    /// use medbook::{MedBook, config::ClientOptions};
    ///
    /// let options = ClientOptions::default().with_request_timeout(Duration::from_secs(10));
    /// let client = MedBook::new_with_options("http://localhost:8080/api", options).unwrap();
    /// ```
    pub fn new_with_options(url: &str, options: ClientOptions) -> Result<Self> {
        let storage = auth::storage_from_kind(&options.token_storage);
        Self::with_storage(url, options, storage)
    }

    /// Create a client persisting its token in `storage`
    pub fn with_storage(
        url: &str,
        options: ClientOptions,
        storage: Arc<dyn TokenStorage>,
    ) -> Result<Self> {
        let state = Arc::new(SessionState::new(storage));
        let gateway = Gateway::new(url, &options, state.clone())?;
        let session = SessionStore::new(gateway.clone(), state);

        Ok(Self {
            url: gateway.base_url().to_string(),
            options,
            appointments: Appointments::new(gateway.clone(), session.clone()),
            availability: AvailabilityClient::new(gateway.clone(), session.clone()),
            doctors: Doctors::new(gateway.clone()),
            gateway,
            session,
        })
    }

    /// Build from `MEDBOOK_API_URL` plus the optional variables read by
    /// [`ClientOptions::from_env`].
    pub fn from_env() -> Result<Self> {
        let url = std::env::var("MEDBOOK_API_URL")
            .map_err(|_| Error::validation("MEDBOOK_API_URL environment variable not found"))?;
        Self::new_with_options(&url, ClientOptions::from_env())
    }

    /// Session lifecycle: start, login, logout, register, profile
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Appointment lifecycle
    pub fn appointments(&self) -> &Appointments {
        &self.appointments
    }

    /// Slot resolution and availability management
    pub fn availability(&self) -> &AvailabilityClient {
        &self.availability
    }

    /// Doctor directory
    pub fn doctors(&self) -> &Doctors {
        &self.doctors
    }

    /// The underlying transport
    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }
}

/// A convenience module for common imports
pub mod prelude {
    pub use crate::appointments::{Appointment, AppointmentStatus};
    pub use crate::auth::{AuthStatus, Capability, Identity, Role};
    pub use crate::availability::{AvailabilityDraft, DayOfWeek, Recurrence, Slot};
    pub use crate::config::ClientOptions;
    pub use crate::error::{Error, ErrorKind};
    pub use crate::tracker::Resolved;
    pub use crate::MedBook;
}
