use duty_core::ValidationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("HTS number {hts_number} not found")]
    NotFound { hts_number: String },

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound { .. } => "not_found",
            Self::Storage(_) => "storage",
        }
    }

    /// Guidance line suitable for showing to whoever supplied the input.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(err) => format!("Invalid input: {err}"),
            Self::NotFound { hts_number } => format!(
                "HTS number {hts_number} not found in the tariff schedule; check the code"
            ),
            Self::Storage(_) => "Tariff schedule is unavailable".to_string(),
        }
    }
}
