//! Fatal error taxonomy for the analysis pipeline.
//!
//! Row-level problems are never errors; they accumulate in an
//! [`IngestReport`](crate::ingest::IngestReport) while processing continues.

use thiserror::Error;

/// Ingestion failures that abort the upload as a whole.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// A required column has no match in the header, so no row-level
    /// fallback is possible.
    #[error("required column(s) missing: {}; header columns: {}", .missing.join(", "), .available.join(", "))]
    MissingColumns {
        missing: Vec<String>,
        available: Vec<String>,
    },

    /// The input has no parseable header row.
    #[error("input has no parseable header row")]
    NoHeader,

    /// The file is structurally unreadable as CSV.
    #[error("unreadable CSV input: {0}")]
    Malformed(#[from] csv::Error),
}
