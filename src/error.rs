// src/error.rs
// Error types shared by the scheduler, configuration and storage layers.

use thiserror::Error;

/// Errors raised by a single scheduling call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchedulerError {
    /// The persisted state tag is not one of the five known states.
    /// This means the stored record is corrupted and must not be repaired silently.
    #[error("invalid card state: {0:?}")]
    InvalidState(String),

    /// Quality grades are 0 (Again) through 3 (Easy).
    #[error("invalid quality grade {0}, expected 0..=3")]
    InvalidQuality(i64),

    /// Suspended cards must be reinstated outside the scheduler before they can be reviewed.
    #[error("card is suspended and cannot be scheduled")]
    Suspended,
}

/// Errors raised while building or loading a [`crate::config::SchedulerConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid scheduler configuration: {0}")]
    Invalid(String),

    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors raised by the card-state store and review log.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error("review log I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("review log encoding error: {0}")]
    Json(#[from] serde_json::Error),
}
