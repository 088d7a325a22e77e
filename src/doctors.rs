//! Doctor directory

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::fetch::Gateway;

/// A doctor as listed by `GET /doctors`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    #[serde(alias = "doctorId")]
    pub id: i64,
    #[serde(default, alias = "doctorName")]
    pub name: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default, alias = "doctorSpecialization")]
    pub specialization: Option<String>,
    #[serde(default, alias = "doctorLicenseNumber")]
    pub license_number: Option<String>,
    #[serde(default, alias = "doctorEmail")]
    pub email: Option<String>,
    #[serde(default, alias = "doctorPhoneNumber")]
    pub phone: Option<String>,
}

impl Doctor {
    pub fn display_name(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("Dr. {} {}", first, last),
            (None, Some(last)) => format!("Dr. {}", last),
            (Some(first), None) => format!("Dr. {}", first),
            (None, None) => format!("Doctor #{}", self.id),
        }
    }
}

/// Read-only access to the doctor list
#[derive(Clone)]
pub struct Doctors {
    gateway: Gateway,
}

impl Doctors {
    pub(crate) fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    pub async fn list(&self) -> Result<Vec<Doctor>> {
        self.gateway.get("/doctors").execute_list().await
    }

    pub async fn get(&self, id: i64) -> Result<Doctor> {
        self.gateway.get(&format!("/doctors/{}", id)).execute().await
    }
}
