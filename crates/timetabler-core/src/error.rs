//! Core error types for timetabler-core.
//!
//! This module defines the error hierarchy using thiserror. Scheduling
//! failures are kept apart from storage and configuration failures so callers
//! can tell an infeasible roster from a broken database.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for timetabler-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors (upstream contract violations)
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Scheduling errors
    #[error("Schedule error: {0}")]
    Schedule(#[from] ScheduleError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// A uniqueness or foreign-key constraint rejected a write
    #[error("Constraint violated: {0}")]
    ConstraintViolated(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dotted key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Empty collection
    #[error("Empty collection: {0}")]
    EmptyCollection(String),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    /// A reference to an entity that does not exist
    #[error("Unknown {kind} '{key}'")]
    UnknownReference { kind: String, key: String },

    /// Two entities share a natural key
    #[error("Duplicate {kind} '{key}'")]
    Duplicate { kind: String, key: String },
}

/// Scheduling errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// No (weekday, window, classroom) combination accepts the section.
    #[error(
        "No feasible placement for section {section_code} (id {section_id}): \
         needs {required_blocks} contiguous block(s) for {enrolled} student(s)"
    )]
    InfeasiblePlacement {
        section_id: i64,
        section_code: String,
        required_blocks: u32,
        enrolled: usize,
    },
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(inner, msg) => match inner.code {
                rusqlite::ErrorCode::DatabaseLocked | rusqlite::ErrorCode::DatabaseBusy => {
                    DatabaseError::Locked
                }
                rusqlite::ErrorCode::ConstraintViolation => DatabaseError::ConstraintViolated(
                    msg.clone().unwrap_or_else(|| inner.to_string()),
                ),
                _ => DatabaseError::QueryFailed(err.to_string()),
            },
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infeasible_placement_names_the_section() {
        let err = ScheduleError::InfeasiblePlacement {
            section_id: 7,
            section_code: "CS101-A".to_string(),
            required_blocks: 3,
            enrolled: 15,
        };
        let msg = err.to_string();
        assert!(msg.contains("CS101-A"));
        assert!(msg.contains("id 7"));
        assert!(msg.contains("3 contiguous"));
    }

    #[test]
    fn constraint_failures_are_classified() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY);")
            .unwrap();
        conn.execute("INSERT INTO t (id) VALUES (1)", []).unwrap();
        let err = conn.execute("INSERT INTO t (id) VALUES (1)", []).unwrap_err();
        assert!(matches!(
            DatabaseError::from(err),
            DatabaseError::ConstraintViolated(_)
        ));
    }

    #[test]
    fn schedule_error_converts_into_core_error() {
        let err: CoreError = ScheduleError::InfeasiblePlacement {
            section_id: 1,
            section_code: "X".into(),
            required_blocks: 1,
            enrolled: 0,
        }
        .into();
        assert!(matches!(err, CoreError::Schedule(_)));
    }
}
