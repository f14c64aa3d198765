use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validation::{require_text, Validate, ValidationError};
use super::SpaceId;

pub type PhysicianId = Uuid;
pub type MedicationId = Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Physician {
    pub id: PhysicianId,
    pub space_id: SpaceId,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl Physician {
    pub fn new(
        space_id: SpaceId,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            space_id,
            first_name: first_name.into(),
            last_name: last_name.into(),
            phone: None,
            email: None,
        }
    }
}

impl Validate for Physician {
    fn validate(&self) -> Result<(), ValidationError> {
        require_text("first_name", &self.first_name, 60)?;
        require_text("last_name", &self.last_name, 60)?;
        match &self.email {
            Some(email) if !email.contains('@') => Err(ValidationError::Field {
                field: "email",
                message: format!("'{}' is not a valid email address", email),
            }),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medication {
    pub id: MedicationId,
    pub space_id: SpaceId,
    pub title: String,
}

impl Medication {
    pub fn new(space_id: SpaceId, title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            space_id,
            title: title.into(),
        }
    }
}

impl Validate for Medication {
    fn validate(&self) -> Result<(), ValidationError> {
        require_text("title", &self.title, 200)
    }
}
