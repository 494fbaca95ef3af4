use thiserror::Error;

use charterdesk_core::DomainError;
use charterdesk_db::repositories::RepositoryError;

/// Operation failures surfaced to callers of the desks. The server maps these
/// onto HTTP statuses one to one; everything that aborts an operation leaves
/// no partial state behind.
#[derive(Debug, Error)]
pub enum DeskError {
    #[error("{0}")]
    Validation(String),

    #[error("{kind} not found")]
    NotFound { kind: &'static str },

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("storage failure: {0}")]
    Repository(#[source] RepositoryError),
}

impl DeskError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(kind: &'static str) -> Self {
        Self::NotFound { kind }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }
}

impl From<DomainError> for DeskError {
    fn from(error: DomainError) -> Self {
        match error {
            DomainError::AlreadyCancelled { .. } => Self::Conflict(error.to_string()),
            other => Self::Validation(other.to_string()),
        }
    }
}

impl From<RepositoryError> for DeskError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::Duplicate(message) => Self::Conflict(message),
            other => Self::Repository(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use charterdesk_core::DomainError;
    use charterdesk_db::repositories::RepositoryError;

    use super::DeskError;

    #[test]
    fn not_found_messages_name_the_resource() {
        assert_eq!(DeskError::not_found("Quote request").to_string(), "Quote request not found");
        assert_eq!(DeskError::not_found("Booking").to_string(), "Booking not found");
    }

    #[test]
    fn double_cancellation_maps_to_conflict() {
        let error: DeskError =
            DomainError::AlreadyCancelled { code: "BK-0A1B2C3D".to_string() }.into();
        assert!(matches!(error, DeskError::Conflict(message) if message.contains("BK-0A1B2C3D")));
    }

    #[test]
    fn other_domain_errors_map_to_validation() {
        let error: DeskError = DomainError::validation("numberOfDays must be at least 1").into();
        assert!(matches!(error, DeskError::Validation(_)));
    }

    #[test]
    fn duplicate_rows_map_to_conflict() {
        let error: DeskError =
            RepositoryError::Duplicate("a booking already exists for quote x".to_string()).into();
        assert!(matches!(error, DeskError::Conflict(_)));

        let error: DeskError = RepositoryError::Decode("bad row".to_string()).into();
        assert!(matches!(error, DeskError::Repository(_)));
    }
}
