//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::{ApiError, LedgerError};

/// Map domain/service errors to a string for CLI output.
pub fn map_error(e: &ApiError) -> String {
    match e {
        ApiError::Ledger(LedgerError::SequenceConflict { .. }) => e.to_string(),
        ApiError::Ledger(inner) => {
            format!("Ledger could not be persisted, run stopped: {}", inner)
        }
        other => other.to_string(),
    }
}
