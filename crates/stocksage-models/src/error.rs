use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::analysis::StateField;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SeriesError {
    #[error("Non-finite price for {symbol} at {timestamp}")]
    NonFinite {
        symbol: String,
        timestamp: DateTime<Utc>,
    },
}

/// Violations of the write-once, in-order population of an analysis state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("State field `{0}` is already set")]
    AlreadySet(StateField),

    #[error("Cannot set `{field}` before `{missing}`")]
    OutOfOrder {
        field: StateField,
        missing: StateField,
    },

    #[error("Cannot set `{field}` after `{after}`")]
    TooLate { field: StateField, after: StateField },

    #[error("No market data for symbol {0}")]
    UnknownSymbol(String),

    #[error("State is incomplete: `{0}` was never set")]
    Incomplete(StateField),
}
