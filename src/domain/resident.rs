use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validation::{require_ordered, require_positive, require_text, Validate, ValidationError};
use super::{Cents, DateInterval, PhysicianId, RentPeriod, SpaceId};

pub type ResidentId = Uuid;
pub type RentId = Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resident {
    pub id: ResidentId,
    pub space_id: SpaceId,
    pub first_name: String,
    pub last_name: String,
    pub physician_id: Option<PhysicianId>,
    pub admitted_on: NaiveDate,
    pub discharged_on: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl Resident {
    pub fn new(
        space_id: SpaceId,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        admitted_on: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            space_id,
            first_name: first_name.into(),
            last_name: last_name.into(),
            physician_id: None,
            admitted_on,
            discharged_on: None,
            created_at: Utc::now(),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// The admission interval, open-ended while the resident is still in the facility.
    pub fn stay(&self) -> DateInterval {
        DateInterval::new(self.admitted_on, self.discharged_on)
    }
}

impl Validate for Resident {
    fn validate(&self) -> Result<(), ValidationError> {
        require_text("first_name", &self.first_name, 60)?;
        require_text("last_name", &self.last_name, 60)?;
        require_ordered(self.admitted_on, self.discharged_on)
    }
}

/// Room rent charged to a resident while `[start, end]` is in effect.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResidentRent {
    pub id: RentId,
    pub resident_id: ResidentId,
    pub period: RentPeriod,
    pub amount: Cents,
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl ResidentRent {
    pub fn new(
        resident_id: ResidentId,
        period: RentPeriod,
        amount: Cents,
        start: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            resident_id,
            period,
            amount,
            start,
            end: None,
            notes: None,
        }
    }

    pub fn interval(&self) -> DateInterval {
        DateInterval::new(self.start, self.end)
    }
}

impl Validate for ResidentRent {
    fn validate(&self) -> Result<(), ValidationError> {
        require_positive("amount", self.amount)?;
        require_ordered(self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_discharge_before_admission_is_rejected() {
        let mut resident = Resident::new(Uuid::new_v4(), "Ada", "Lovelace", date("2024-03-01"));
        assert!(resident.validate().is_ok());

        resident.discharged_on = Some(date("2024-02-01"));
        assert_eq!(resident.validate(), Err(ValidationError::StartGreaterEndDate));
    }

    #[test]
    fn test_rent_requires_positive_amount() {
        let rent = ResidentRent::new(Uuid::new_v4(), RentPeriod::Monthly, 0, date("2024-03-01"));
        assert!(matches!(
            rent.validate(),
            Err(ValidationError::Field { field: "amount", .. })
        ));
    }
}
