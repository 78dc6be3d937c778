use thiserror::Error;

/// Values rejected while building domain types from text or wire data.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("invalid value: {message}")]
    Validation { message: String },
    #[error("unknown category `{value}`")]
    UnknownCategory { value: String },
}

impl DomainError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn unknown_category(value: impl Into<String>) -> Self {
        Self::UnknownCategory {
            value: value.into(),
        }
    }
}
