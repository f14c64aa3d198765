use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validation::{require_positive, require_text, Validate, ValidationError};
use super::{Cents, SpaceId};

pub type BaseRateId = Uuid;

/// Monthly base rate of a care level, effective from `date`.
/// At most one rate per (space, care level, date).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseRate {
    pub id: BaseRateId,
    pub space_id: SpaceId,
    pub care_level: String,
    pub date: NaiveDate,
    pub amount: Cents,
}

impl BaseRate {
    pub fn new(
        space_id: SpaceId,
        care_level: impl Into<String>,
        date: NaiveDate,
        amount: Cents,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            space_id,
            care_level: care_level.into(),
            date,
            amount,
        }
    }
}

impl Validate for BaseRate {
    fn validate(&self) -> Result<(), ValidationError> {
        require_text("care_level", &self.care_level, 50)?;
        require_positive("amount", self.amount)
    }
}
