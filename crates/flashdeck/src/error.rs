//! Error types for flashdeck.
//!
//! This module defines all error types used throughout the flashdeck crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::validation::ValidationError;

/// The kind of record an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// A deck record.
    Deck,
    /// A flashcard record.
    Flashcard,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deck => write!(f, "deck"),
            Self::Flashcard => write!(f, "flashcard"),
        }
    }
}

/// The main error type for flashdeck operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Request Errors ===
    /// A payload failed validation. Nothing was written.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// What kind of record was looked up.
        entity: EntityKind,
        /// The identifier that did not resolve.
        id: String,
    },

    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for flashdeck operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a not-found error for a deck.
    #[must_use]
    pub fn deck_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: EntityKind::Deck,
            id: id.into(),
        }
    }

    /// Create a not-found error for a flashcard.
    #[must_use]
    pub fn flashcard_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: EntityKind::Flashcard,
            id: id.into(),
        }
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error is a rejected payload.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this error is a missing record.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this error came from the persistence layer.
    #[must_use]
    pub fn is_store_error(&self) -> bool {
        matches!(
            self,
            Self::DatabaseOpen { .. }
                | Self::DatabaseQuery(_)
                | Self::DatabaseMigration { .. }
                | Self::DirectoryCreate { .. }
                | Self::Io(_)
        )
    }
}
