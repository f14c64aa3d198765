use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validation::{require_text, Validate, ValidationError};

pub type SpaceId = Uuid;

/// A tenant: every other entity belongs to exactly one space.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Space {
    pub id: SpaceId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Space {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}

impl Validate for Space {
    fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name, 50)
    }
}
