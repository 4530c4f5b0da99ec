//! GraphQL schema registry and request parsing.

mod field_type;
pub(crate) mod query;
mod schema;
mod selection;

use displaydoc::Display;
pub use field_type::FieldType;
pub(crate) use field_type::InvalidValue;
pub(crate) use query::Operation;
pub use query::OperationKind;
pub use query::Query;
pub(crate) use query::TYPENAME;
pub use schema::Argument;
pub use schema::Field;
pub use schema::ObjectType;
pub use schema::Schema;
pub use schema::SchemaError;
pub(crate) use selection::*;
use thiserror::Error;

use crate::graphql::ErrorExtension;
use crate::graphql::Location;
use crate::json_ext::Object;

/// Errors that prevent a request from being executed at all.
#[derive(Error, Debug, Display, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SpecError {
    /// missing query string
    MissingQuery,
    /// selection processing recursion limit exceeded
    RecursionLimitExceeded,
    /// invalid type error, expected another type than '{0}'
    InvalidType(String),
    /// parsing error: {message}
    ParsingError {
        message: String,
        locations: Vec<Location>,
    },
    /// Unknown operation named "{0}"
    UnknownOperation(String),
    /// Must provide operation name if query contains multiple operations
    MissingOperationName,
    /// the document does not contain any operation
    NoOperation,
    /// {0} operations are not supported
    UnsupportedOperation(&'static str),
    /// {0} are not supported
    UnsupportedDefinition(&'static str),
    /// Variable "${variable}" is not defined by operation "{operation}"
    UndefinedVariable {
        variable: String,
        operation: String,
    },
    /// {0}
    InvalidVariable(String),
    /// query depth of {depth} exceeds the limit of {limit}
    MaxDepthExceeded { depth: u32, limit: u32 },
}

impl SpecError {
    pub(crate) fn locations(&self) -> &[Location] {
        match self {
            SpecError::ParsingError { locations, .. } => locations,
            _ => &[],
        }
    }
}

impl ErrorExtension for SpecError {
    fn extension_code(&self) -> String {
        match self {
            SpecError::RecursionLimitExceeded => "RECURSION_LIMIT_EXCEEDED",
            SpecError::ParsingError { .. } => "PARSING_ERROR",
            SpecError::UnknownOperation(_) => "GRAPHQL_UNKNOWN_OPERATION_NAME",
            SpecError::UnsupportedOperation(_) => "OPERATION_NOT_SUPPORTED",
            SpecError::MaxDepthExceeded { .. } => "MAX_DEPTH_LIMIT",
            SpecError::MissingQuery
            | SpecError::InvalidType(_)
            | SpecError::MissingOperationName
            | SpecError::NoOperation
            | SpecError::UnsupportedDefinition(_)
            | SpecError::UndefinedVariable { .. }
            | SpecError::InvalidVariable(_) => "GRAPHQL_VALIDATION_FAILED",
        }
        .to_string()
    }

    fn custom_extension_details(&self) -> Option<Object> {
        let mut obj = Object::new();
        if let SpecError::InvalidType(ty) = self {
            obj.insert("type", ty.clone().into());
        }
        (!obj.is_empty()).then_some(obj)
    }
}
