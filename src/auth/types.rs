//! Types for authentication and user management

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// The caller's role. Mutually exclusive; every capability derives from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "ROLE_PATIENT", alias = "PATIENT")]
    Patient,
    #[serde(rename = "ROLE_DOCTOR", alias = "DOCTOR")]
    Doctor,
    #[serde(rename = "ROLE_ADMIN", alias = "ADMIN")]
    Admin,
}

impl Role {
    /// Parse either the `ROLE_`-prefixed or the bare form.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim_start_matches("ROLE_") {
            "PATIENT" => Some(Role::Patient),
            "DOCTOR" => Some(Role::Doctor),
            "ADMIN" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// Doctor-specific part of an identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorDetails {
    pub doctor_id: Option<i64>,
    pub doctor_name: Option<String>,
    pub doctor_specialization: Option<String>,
    pub doctor_license_number: Option<String>,
    pub doctor_email: Option<String>,
    pub doctor_phone_number: Option<String>,
}

/// Patient-specific part of an identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientDetails {
    pub patient_id: Option<i64>,
    pub patient_name: Option<String>,
    pub patient_email: Option<String>,
    pub patient_phone_number: Option<String>,
}

/// The resolved user record of a live session (`GET /user/me`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub last_login: Option<NaiveDateTime>,
    #[serde(default)]
    pub doctor_details: Option<DoctorDetails>,
    #[serde(default)]
    pub patient_details: Option<PatientDetails>,
}

impl Identity {
    /// The id appointments and availabilities use for this user as a doctor.
    pub fn doctor_id(&self) -> i64 {
        self.doctor_details
            .as_ref()
            .and_then(|d| d.doctor_id)
            .unwrap_or(self.id)
    }

    /// The id appointments use for this user as a patient.
    pub fn patient_id(&self) -> i64 {
        self.patient_details
            .as_ref()
            .and_then(|p| p.patient_id)
            .unwrap_or(self.id)
    }

    /// "First Last", or the username when no name is on record
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            (Some(first), None) => first.clone(),
            (None, Some(last)) => last.clone(),
            (None, None) => self.username.clone(),
        }
    }
}

/// Login request body
#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Login response (`POST /auth/login`)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

impl LoginResponse {
    /// Build a minimal identity from the login answer.
    ///
    /// Used when `/user/me` cannot be reached right after login. Returns `None`
    /// when the response lacks the id or a recognizable role.
    pub fn fallback_identity(&self) -> Option<Identity> {
        let role = self.role.as_deref().and_then(Role::parse)?;
        Some(Identity {
            id: self.user_id?,
            username: self.username.clone().unwrap_or_default(),
            email: self.email.clone(),
            first_name: None,
            last_name: None,
            phone: None,
            address: None,
            gender: None,
            role,
            created_at: None,
            last_login: None,
            doctor_details: None,
            patient_details: None,
        })
    }
}

/// Account creation request (`POST /auth/register`)
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// Profile fields a user may change (`PUT /user/me`)
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// What views observe about the session.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthStatus {
    /// `start()` has not completed yet; protected views must not render
    Initializing,
    Unauthenticated,
    Authenticated(Identity),
}

impl AuthStatus {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            AuthStatus::Authenticated(identity) => Some(identity),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthStatus::Authenticated(_))
    }
}
