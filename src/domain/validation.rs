use chrono::NaiveDate;
use thiserror::Error;

use super::Cents;

/// Rule violations detected on an entity before it is persisted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field}: {message}")]
    Field {
        field: &'static str,
        message: String,
    },

    #[error("start date is greater than end date")]
    StartGreaterEndDate,
}

/// Declarative rules run by every `add` and `edit` before persistence.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

pub(crate) fn require_text(
    field: &'static str,
    value: &str,
    max_len: usize,
) -> Result<(), ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Field {
            field,
            message: "must not be blank".to_string(),
        });
    }
    if trimmed.chars().count() > max_len {
        return Err(ValidationError::Field {
            field,
            message: format!("must be at most {} characters", max_len),
        });
    }
    Ok(())
}

pub(crate) fn require_positive(field: &'static str, amount: Cents) -> Result<(), ValidationError> {
    if amount <= 0 {
        return Err(ValidationError::Field {
            field,
            message: "must be greater than zero".to_string(),
        });
    }
    Ok(())
}

pub(crate) fn require_ordered(
    start: NaiveDate,
    end: Option<NaiveDate>,
) -> Result<(), ValidationError> {
    match end {
        Some(end) if start > end => Err(ValidationError::StartGreaterEndDate),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_text() {
        assert!(require_text("title", "Care plan", 10).is_ok());
        assert!(matches!(
            require_text("title", "   ", 10),
            Err(ValidationError::Field { field: "title", .. })
        ));
        assert!(require_text("title", "a very long title", 5).is_err());
    }

    #[test]
    fn test_require_ordered() {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(
            require_ordered(start, Some(end)),
            Err(ValidationError::StartGreaterEndDate)
        );
        assert!(require_ordered(start, Some(start)).is_ok());
        assert!(require_ordered(start, None).is_ok());
    }
}
