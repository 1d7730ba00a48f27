//! Error types for timetable-engine operations.

use std::time::Duration;

use thiserror::Error;

use crate::interval::Minutes;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimetableError {
    #[error("Malformed time: {0:?}")]
    MalformedTime(String),

    #[error("Unknown day: {0:?} (expected Monday to Friday)")]
    UnknownDay(String),

    #[error("Draft is missing {0}")]
    Incomplete(&'static str),

    #[error("Invalid interval: end time {end} must be after start time {start}")]
    InvalidInterval { start: Minutes, end: Minutes },

    #[error("{0}")]
    Conflict(String),

    #[error("Conflict check still in progress")]
    CheckPending,

    #[error("Conflict probe failed: {0}")]
    Probe(String),

    #[error("Conflict probe timed out after {0:?}")]
    ProbeTimeout(Duration),

    #[error("Timetable store error: {0}")]
    Store(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl TimetableError {
    /// True for the variants that mean "not enough to go on" rather than a
    /// real validation failure.
    pub fn is_insufficient_data(&self) -> bool {
        matches!(
            self,
            TimetableError::MalformedTime(_)
                | TimetableError::UnknownDay(_)
                | TimetableError::Incomplete(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, TimetableError>;
