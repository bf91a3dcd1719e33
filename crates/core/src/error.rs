use thiserror::Error;

/// Rejections raised before any duty is computed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("HTS number cannot be empty")]
    Empty,

    #[error("HTS number must have at least 4 digits (got {digits})")]
    TooShort { digits: usize },

    #[error("HTS number cannot exceed 10 digits (got {digits})")]
    TooLong { digits: usize },

    #[error("HTS number must contain only digits: {raw:?}")]
    NonNumeric { raw: String },

    #[error("{field} cannot be negative (got {value})")]
    NegativeAmount { field: &'static str, value: f64 },

    #[error("{field} must be greater than zero")]
    NonPositive { field: &'static str },

    #[error("{field} must be a finite number")]
    NotFinite { field: &'static str },

    #[error("search text cannot be empty")]
    EmptyQuery,
}

impl ValidationError {
    /// Short machine-readable tag for callers that branch on the failure kind.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::TooShort { .. } => "too short",
            Self::TooLong { .. } => "too long",
            Self::NonNumeric { .. } => "non-numeric",
            Self::NegativeAmount { .. } => "negative amount",
            Self::NonPositive { .. } => "non-positive",
            Self::NotFinite { .. } => "not finite",
            Self::EmptyQuery => "empty query",
        }
    }
}
