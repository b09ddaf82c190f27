use std::io;

use thiserror::Error;

use crate::types::{OracleName, SourceId};

/// Error type for loading, oracle transport, configuration, and reporting failures.
///
/// A learner that simply cannot find a program is not an error; see
/// [`ProgramResult::NotLearned`](crate::data::ProgramResult::NotLearned).
#[derive(Debug, Error)]
pub enum RewriteError {
    /// The record source could not be opened or read.
    #[error("record source '{source_id}' is unavailable: {reason}")]
    SourceUnavailable {
        /// Source that failed.
        source_id: SourceId,
        /// What went wrong.
        reason: String,
    },
    /// The oracle could not be reached or stopped without answering.
    #[error("oracle '{oracle}' is unavailable: {reason}")]
    OracleUnavailable {
        /// Oracle that failed.
        oracle: OracleName,
        /// What went wrong.
        reason: String,
    },
    /// The oracle answered, but the answer could not be decoded.
    #[error("oracle '{oracle}' returned an unreadable response: {details}")]
    OracleProtocol {
        /// Oracle that answered.
        oracle: OracleName,
        /// Decoding failure details.
        details: String,
    },
    /// The oracle did not answer before the call deadline.
    #[error("oracle '{oracle}' did not answer within {timeout_ms}ms")]
    OracleTimeout {
        /// Oracle that was stopped.
        oracle: OracleName,
        /// Deadline that elapsed, in milliseconds.
        timeout_ms: u128,
    },
    /// Underlying IO failure.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// The report could not be written.
    #[error("report failure: {0}")]
    Report(String),
}
