//! Error types for agora-store
//!
//! Every repository operation returns [`StoreError`]. Callers branch on
//! [`StoreError::kind`] rather than on message text.

use thiserror::Error;

use crate::models::ValidationError;

pub type StoreResult<T> = Result<T, StoreError>;

/// Coarse classification of a [`StoreError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    ConnectionFailure,
    ValidationFailure,
    Database,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("not found: {resource} '{id}'")]
    NotFound { resource: &'static str, id: String },

    #[error("already exists: {resource} ({detail})")]
    AlreadyExists { resource: &'static str, detail: String },

    #[error("connection failure: {reason}")]
    Connection {
        reason: String,
        #[source]
        source: Option<sqlx::Error>,
    },

    #[error("validation failure: {0}")]
    Validation(#[from] ValidationError),

    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            Self::Connection { .. } => ErrorKind::ConnectionFailure,
            Self::Validation(_) => ErrorKind::ValidationFailure,
            Self::Database(_) => ErrorKind::Database,
        }
    }

    pub(crate) fn not_found(resource: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource,
            id: id.into(),
        }
    }

    pub(crate) fn connection(reason: impl Into<String>) -> Self {
        Self::Connection {
            reason: reason.into(),
            source: None,
        }
    }
}

/// Map a table-prefixed constraint name to the resource it guards.
fn resource_for_constraint(constraint: &str) -> &'static str {
    if constraint.starts_with("community_members") {
        "membership"
    } else if constraint.starts_with("communities") {
        "community"
    } else if constraint.starts_with("users") {
        "user"
    } else if constraint.starts_with("threads") {
        "thread"
    } else {
        "record"
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            let constraint = db.constraint().unwrap_or_default().to_owned();
            if db.is_unique_violation() {
                return Self::AlreadyExists {
                    resource: resource_for_constraint(&constraint),
                    detail: constraint,
                };
            }
            if db.is_foreign_key_violation() {
                return Self::NotFound {
                    resource: "referenced record",
                    id: constraint,
                };
            }
        }

        match err {
            sqlx::Error::RowNotFound => Self::not_found("record", "unknown"),
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => Self::Connection {
                reason: err.to_string(),
                source: Some(err),
            },
            other => Self::Database(other),
        }
    }
}
