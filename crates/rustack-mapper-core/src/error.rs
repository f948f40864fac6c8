//! Error types for the mapper core.

use std::fmt;

use crate::marshal::MarshalError;

/// How many results a cursor operation required.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// `first()`: one or more.
    AtLeastOne,
    /// `one()`: exactly one.
    ExactlyOne,
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AtLeastOne => f.write_str("at least one result"),
            Self::ExactlyOne => f.write_str("exactly one result"),
        }
    }
}

/// Errors surfaced by the mapper core.
#[derive(Debug, thiserror::Error)]
pub enum MapperError {
    /// A condition cannot be used where it was supplied.
    #[error("invalid condition {condition}: {message}")]
    InvalidCondition {
        /// What is wrong with it.
        message: String,
        /// Debug rendering of the offending condition.
        condition: String,
    },

    /// A query or scan was configured in a way the service cannot serve.
    #[error("invalid search: {0}")]
    InvalidSearch(String),

    /// A model declaration is inconsistent, e.g. two hash keys.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// A column name was not declared on the model.
    #[error("model {model} has no column {column}")]
    UnknownColumn {
        /// Model name.
        model: String,
        /// Requested column name.
        column: String,
    },

    /// An attribute was read or deleted while unset.
    #[error("{model}.{column} is not set")]
    MissingAttribute {
        /// Model name.
        model: String,
        /// Column name.
        column: String,
    },

    /// The result set did not have the cardinality the call requires.
    #[error("constraint violation: expected {expected}, {message}")]
    ConstraintViolation {
        /// Cardinality the caller asked for.
        expected: Cardinality,
        /// What was found instead.
        message: String,
    },

    /// A value did not fit its declared wire type.
    #[error(transparent)]
    Marshal(#[from] MarshalError),

    /// The transport call failed. Passed through untouched.
    #[error(transparent)]
    Transport(anyhow::Error),
}

impl MapperError {
    /// Build an [`MapperError::InvalidCondition`] from anything displayable.
    pub fn invalid_condition(message: impl Into<String>, condition: impl fmt::Display) -> Self {
        Self::InvalidCondition {
            message: message.into(),
            condition: condition.to_string(),
        }
    }

    /// Build an [`MapperError::InvalidSearch`].
    pub fn invalid_search(message: impl Into<String>) -> Self {
        Self::InvalidSearch(message.into())
    }

    /// Returns `true` for cardinality failures from `first()` / `one()`.
    #[must_use]
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, Self::ConstraintViolation { .. })
    }
}

/// Convenience result type for mapper operations.
pub type MapperResult<T> = Result<T, MapperError>;
