use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found")]
    NotFound,
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Payment rejected: {0}")]
    PaymentRejected(String),
    #[error("Payment gateway error: {0}")]
    Gateway(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn missing_field(field: &str) -> Self {
        DomainError::InvalidInput(format!("{field} is required"))
    }
}
