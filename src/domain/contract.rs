use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validation::{require_ordered, Validate, ValidationError};
use super::ResidentId;

pub type ContractId = Uuid;

/// Payment arrangement a contract is written under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractType {
    PrivatePay,
    Medicaid,
    LongTermCare,
}

impl ContractType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractType::PrivatePay => "private_pay",
            ContractType::Medicaid => "medicaid",
            ContractType::LongTermCare => "long_term_care",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "private_pay" => Some(ContractType::PrivatePay),
            "medicaid" => Some(ContractType::Medicaid),
            "long_term_care" => Some(ContractType::LongTermCare),
            _ => None,
        }
    }
}

impl std::fmt::Display for ContractType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A resident's contract. `end = None` marks the active contract; a resident has at
/// most one active contract at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    pub id: ContractId,
    pub resident_id: ResidentId,
    pub contract_type: ContractType,
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
    /// Type-specific options, stored as given.
    pub options: serde_json::Value,
}

impl Contract {
    pub fn new(resident_id: ResidentId, contract_type: ContractType, start: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            resident_id,
            contract_type,
            start,
            end: None,
            options: serde_json::Value::Null,
        }
    }

    pub fn is_active(&self) -> bool {
        self.end.is_none()
    }
}

impl Validate for Contract {
    fn validate(&self) -> Result<(), ValidationError> {
        if !(self.options.is_null() || self.options.is_object()) {
            return Err(ValidationError::Field {
                field: "options",
                message: "must be an object".to_string(),
            });
        }
        require_ordered(self.start, self.end)
    }
}
