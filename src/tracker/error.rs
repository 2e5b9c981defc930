use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors produced by tracker mutations. Queries never fail; lookups that
/// can miss return `Option` or `bool` instead.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrackerError {
    #[error("activity \"{0}\" already exists")]
    DuplicateName(String),
    #[error("no activity named \"{0}\"")]
    UnknownActivity(String),
    #[error("activity \"{0}\" already has a running instance")]
    AlreadyRunning(String),
    #[error("stop time {stop} precedes start time {start}")]
    InvalidInterval {
        start: DateTime<Utc>,
        stop: DateTime<Utc>,
    },
    #[error("an instance starting at {0} already exists")]
    DuplicateStart(DateTime<Utc>),
}
