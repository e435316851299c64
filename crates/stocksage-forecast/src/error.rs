use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    #[error("Insufficient history for {symbol}: have {actual} {unit}, need at least {required}")]
    InsufficientData {
        symbol: String,
        required: usize,
        actual: usize,
        unit: &'static str,
    },

    #[error("Regression system for {0} is singular")]
    Singular(String),

    #[error("Invalid forecast configuration: {0}")]
    InvalidConfig(String),

    #[error("Length mismatch: {actual} actual values, {predicted} predicted values")]
    LengthMismatch { actual: usize, predicted: usize },

    #[error("Cannot compute metrics on empty input")]
    EmptyInput,

    #[error("Actual value at index {index} is zero; MAPE is undefined")]
    DivisionByZero { index: usize },
}
