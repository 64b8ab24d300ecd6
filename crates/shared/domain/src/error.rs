//! Coded data errors.
//!
//! Every error carries a numeric code so batch operations can report a
//! failure per item instead of failing the whole request.

use serde_json::Value;
use thiserror::Error;

use crate::entity::Id;

/// Base of the data error code range.
pub const DATA_ERROR_CODE: i32 = 600;

/// Errors raised while reading, mapping or writing records.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataError {
    #[error("Invalid id: {0}")]
    InvalidId(Id),

    #[error("{entity} with id {id} was not found")]
    NotFoundEntityById { id: Id, entity: String },

    #[error("Invalid date '{value}', expected format {format}")]
    InvalidDateFormat { value: String, format: String },

    #[error("Invalid data type at '{0}'")]
    InvalidDataType(String),

    #[error("Record is referenced by other data and cannot be deleted")]
    ExistsForeignKeyConstraint,

    #[error("No data provided")]
    NotExistsData,

    #[error("Cannot construct {0}")]
    InvalidConstructor(String),

    #[error("Clone is not supported")]
    CloneNotSupported,

    /// Error raised by a service hook with its own code.
    #[error("{message}")]
    Coded {
        code: i32,
        message: String,
        data: Option<Value>,
    },
}

impl DataError {
    pub fn not_found(id: Id, entity: impl Into<String>) -> Self {
        DataError::NotFoundEntityById {
            id,
            entity: entity.into(),
        }
    }

    pub fn invalid_date(value: impl Into<String>, format: impl Into<String>) -> Self {
        DataError::InvalidDateFormat {
            value: value.into(),
            format: format.into(),
        }
    }

    pub fn coded(code: i32, message: impl Into<String>) -> Self {
        DataError::Coded {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Attach a structured payload (only kept on coded errors).
    pub fn with_data(self, data: Value) -> Self {
        match self {
            DataError::Coded { code, message, .. } => DataError::Coded {
                code,
                message,
                data: Some(data),
            },
            other => other,
        }
    }

    /// Numeric code reported to clients.
    pub fn code(&self) -> i32 {
        match self {
            DataError::InvalidId(_) => DATA_ERROR_CODE + 1,
            DataError::NotFoundEntityById { .. } => DATA_ERROR_CODE + 2,
            DataError::InvalidDateFormat { .. } => DATA_ERROR_CODE + 3,
            DataError::InvalidDataType(_) => DATA_ERROR_CODE + 4,
            DataError::ExistsForeignKeyConstraint => DATA_ERROR_CODE + 5,
            DataError::NotExistsData => DATA_ERROR_CODE + 6,
            DataError::InvalidConstructor(_) => DATA_ERROR_CODE + 7,
            DataError::CloneNotSupported => DATA_ERROR_CODE + 8,
            DataError::Coded { code, .. } => *code,
        }
    }

    /// Structured payload, if any.
    pub fn data(&self) -> Option<&Value> {
        match self {
            DataError::Coded { data, .. } => data.as_ref(),
            _ => None,
        }
    }
}

/// Result type alias for data operations
pub type DataResult<T> = Result<T, DataError>;
