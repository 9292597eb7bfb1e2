use std::borrow::Cow;

use thiserror::Error;

/// Top-level error type returned by field stores and the assembly service.
#[derive(Debug, Error)]
pub enum RepoError {
    /// Validation failed for one or more request keys.
    #[error("validation failed")]
    Validation(#[from] ValidationError),

    /// Underlying Redis command failed.
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Target row was not found when performing a mutation.
    #[error("entity not found")]
    NotFound { entity_id: Option<String> },

    /// Invalid input supplied to a store operation.
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    /// Unique constraint violation - the value(s) already exist on another row.
    #[error("unique constraint violation: fields {fields:?} with values {values:?} already exist on entity '{existing_entity_id}'")]
    UniqueConstraintViolation {
        fields: Vec<String>,
        values: Vec<String>,
        existing_entity_id: String,
    },

    #[error("{message}")]
    Other { message: Cow<'static, str> },
}

impl RepoError {
    /// True when the store refused the mutation because of the data it carried,
    /// as opposed to a transport or serialization failure.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            RepoError::Validation(_)
                | RepoError::NotFound { .. }
                | RepoError::InvalidRequest { .. }
                | RepoError::UniqueConstraintViolation { .. }
        )
    }

    pub(crate) fn other(message: impl Into<Cow<'static, str>>) -> Self {
        RepoError::Other {
            message: message.into(),
        }
    }
}

/// Collection of validation issues encountered while checking a request.
#[derive(Debug, Error)]
#[error("validation errors: {issues:?}")]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationError {
    pub fn new<I>(issues: I) -> Self
    where
        I: IntoIterator<Item = ValidationIssue>,
    {
        Self {
            issues: issues.into_iter().collect(),
        }
    }

    /// Convenience helper for constructing a single-key validation error.
    pub fn single(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new([ValidationIssue::new(field, code, message)])
    }

    /// Messages reported against one request key, in the order they were raised.
    pub fn messages_for(&self, field: &str) -> Vec<&str> {
        self.issues
            .iter()
            .filter(|issue| issue.field == field)
            .map(|issue| issue.message.as_str())
            .collect()
    }

    /// Turns an accumulated issue list into `Ok(())` when empty.
    pub fn check(issues: Vec<ValidationIssue>) -> ValidationResult<()> {
        if issues.is_empty() { Ok(()) } else { Err(Self::new(issues)) }
    }
}

/// Detailed validation failure for a single request key.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationIssue {
    pub field: String,
    pub code: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code: code.into(),
            message: message.into(),
        }
    }
}

pub type ValidationResult<T> = Result<T, ValidationError>;

/// Failures raised by the spreadsheet lookup collaborator.
#[derive(Debug, Error)]
pub enum SheetError {
    #[error("sheet '{sheet}' is not available at {data_url}")]
    UnknownSheet { data_url: String, sheet: String },

    #[error("malformed cell reference '{reference}'")]
    InvalidCell { reference: String },
}
