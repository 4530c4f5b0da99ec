//! Field errors.
use displaydoc::Display;
use thiserror::Error;

use crate::graphql::ErrorExtension;
use crate::json_ext::Object;
use crate::resolver::ResolverError;

/// Errors localized to a single field of the response.
///
/// The field is left out of the response data and the error is reported with its path.
#[derive(Error, Display, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FieldError {
    /// Cannot query field "{field}" on type "{type_name}"
    FieldNotFound { type_name: String, field: String },

    /// Field "{type_name}.{field}" argument "{argument}" of type "{ty}" is required, but it was not provided
    MissingArgument {
        type_name: String,
        field: String,
        argument: String,
        ty: String,
    },

    /// Invalid value for argument "{argument}" of field "{type_name}.{field}", expected type "{ty}"
    InvalidArgument {
        type_name: String,
        field: String,
        argument: String,
        ty: String,
    },

    /// Unknown argument "{argument}" on field "{type_name}.{field}"
    UnknownArgument {
        type_name: String,
        field: String,
        argument: String,
    },

    /// Field "{field}" of type "{ty}" must have a selection of subfields
    MissingSubselection { field: String, ty: String },

    /// Field "{field}" must not have a selection since type "{ty}" has no subfields
    UnexpectedSubselection { field: String, ty: String },

    /// {0}
    Resolver(#[from] ResolverError),

    /// Cannot return null for non-nullable field {type_name}.{field}
    NonNullableField { type_name: String, field: String },

    /// {0}
    InvalidValue(String),
}

impl ErrorExtension for FieldError {
    fn extension_code(&self) -> String {
        match self {
            FieldError::FieldNotFound { .. } => "INVALID_FIELD",
            FieldError::MissingArgument { .. }
            | FieldError::InvalidArgument { .. }
            | FieldError::UnknownArgument { .. } => "INVALID_ARGUMENT",
            FieldError::MissingSubselection { .. } | FieldError::UnexpectedSubselection { .. } => {
                "GRAPHQL_VALIDATION_FAILED"
            }
            FieldError::Resolver(_) => "RESOLVER_ERROR",
            FieldError::NonNullableField { .. } | FieldError::InvalidValue(_) => {
                "RESPONSE_VALIDATION_FAILED"
            }
        }
        .to_string()
    }

    fn custom_extension_details(&self) -> Option<Object> {
        match self {
            FieldError::FieldNotFound { type_name, field } => {
                let mut details = Object::new();
                details.insert("type", type_name.clone().into());
                details.insert("field", field.clone().into());
                Some(details)
            }
            FieldError::MissingArgument { argument, .. }
            | FieldError::InvalidArgument { argument, .. }
            | FieldError::UnknownArgument { argument, .. } => {
                let mut details = Object::new();
                details.insert("argument", argument.clone().into());
                Some(details)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json_bytes::json;

    use super::*;
    use crate::json_ext::Path;

    #[test]
    fn field_not_found_to_graphql_error() {
        let error = FieldError::FieldNotFound {
            type_name: "User".to_string(),
            field: "email".to_string(),
        }
        .to_graphql_error(Some(Path::empty().join("user").join("email")));
        assert_eq!(
            serde_json_bytes::to_value(&error).unwrap(),
            json!({
                "message": "Cannot query field \"email\" on type \"User\"",
                "path": ["user", "email"],
                "extensions": {
                    "type": "User",
                    "field": "email",
                    "code": "INVALID_FIELD"
                }
            })
        );
    }

    #[test]
    fn resolver_errors_keep_their_message() {
        let error: FieldError = ResolverError::DataSource("connection refused".to_string()).into();
        assert_eq!(error.to_string(), "data source error: connection refused");
        assert_eq!(error.extension_code(), "RESOLVER_ERROR");
    }

    #[test]
    fn argument_error_codes() {
        let error = FieldError::MissingArgument {
            type_name: "Query".to_string(),
            field: "user".to_string(),
            argument: "login".to_string(),
            ty: "String!".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Field \"Query.user\" argument \"login\" of type \"String!\" is required, but it was not provided"
        );
        assert_eq!(error.extension_code(), "INVALID_ARGUMENT");
    }
}
