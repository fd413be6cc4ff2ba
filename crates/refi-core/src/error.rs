use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RefiError {
    #[error("Invalid input for {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Invalid horizon: {years} years cannot be expressed as a non-negative month count")]
    InvalidHorizon { years: Decimal },

    #[error("Numeric overflow in {context}")]
    Overflow { context: String },

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for RefiError {
    fn from(e: serde_json::Error) -> Self {
        RefiError::SerializationError(e.to_string())
    }
}
