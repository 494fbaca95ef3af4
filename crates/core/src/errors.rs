use thiserror::Error;

use crate::domain::quote::QuoteStatus;

/// Business-rule violations raised by the entity constructors and state
/// machines. Storage and transport concerns carry their own error types.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("{0}")]
    Validation(String),

    #[error("invalid quote transition from {} to {}", from.as_str(), to.as_str())]
    InvalidQuoteTransition { from: QuoteStatus, to: QuoteStatus },

    #[error("booking {code} is already cancelled")]
    AlreadyCancelled { code: String },
}

impl DomainError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::DomainError;
    use crate::domain::quote::QuoteStatus;

    #[test]
    fn transition_error_names_both_states() {
        let error = DomainError::InvalidQuoteTransition {
            from: QuoteStatus::Approved,
            to: QuoteStatus::Pending,
        };
        assert_eq!(error.to_string(), "invalid quote transition from approved to pending");
    }

    #[test]
    fn cancelled_error_carries_the_display_code() {
        let error = DomainError::AlreadyCancelled { code: "BK-0A1B2C3D".to_string() };
        assert_eq!(error.to_string(), "booking BK-0A1B2C3D is already cancelled");
    }
}
