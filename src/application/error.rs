use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{
    EffectiveDateError, EntityKind, MonthKey, ResidentId, RowId, SelectionError, ValidationError,
};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: EntityKind, id: Uuid },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid {field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("Start date is greater than end date")]
    StartGreaterEndDate,

    #[error("Invalid effective date {date}: outside of ledger month {month}")]
    InvalidEffectiveDate { date: NaiveDate, month: MonthKey },

    #[error("Base rate for care level '{care_level}' already exists on {date}")]
    DuplicateBaseRateByDate { care_level: String, date: NaiveDate },

    #[error("Category '{0}' allows a single row per assessment")]
    AssessmentCategoryMultiple(String),

    #[error("Row {0} does not belong to the assessment form")]
    RowNotInForm(RowId),

    #[error("Resident ledger already exists for resident {resident_id} in {month}")]
    ResidentLedgerAlreadyExists { resident_id: ResidentId, month: MonthKey },

    #[error("Active contract already exists for resident {0}")]
    ContractAlreadyExists(ResidentId),

    #[error("Blob storage error: {0}")]
    Blob(String),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

impl AppError {
    pub fn not_found(entity: EntityKind, id: Uuid) -> Self {
        AppError::NotFound { entity, id }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound { .. })
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::Field { field, message } => AppError::Validation { field, message },
            ValidationError::StartGreaterEndDate => AppError::StartGreaterEndDate,
        }
    }
}

impl From<SelectionError> for AppError {
    fn from(err: SelectionError) -> Self {
        match err {
            SelectionError::RowNotInForm(row_id) => AppError::RowNotInForm(row_id),
            SelectionError::CategoryMultiple(title) => AppError::AssessmentCategoryMultiple(title),
        }
    }
}

impl From<EffectiveDateError> for AppError {
    fn from(err: EffectiveDateError) -> Self {
        AppError::InvalidEffectiveDate {
            date: err.date,
            month: err.month,
        }
    }
}
