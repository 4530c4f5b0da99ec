use serde::Deserialize;
use serde::Serialize;
use serde_json_bytes::ByteString;
use serde_json_bytes::Map;

use crate::graphql::Error;
use crate::json_ext::Object;
use crate::json_ext::Value;

/// The result of resolving a GraphQL request.
///
/// `data` is absent when the request could not be executed at all
/// (syntax error, unknown operation, invalid variables, ...).
/// Otherwise it holds every field that resolved, and `errors` lists the fields that did not.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct Response {
    /// The response data.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub data: Option<Value>,

    /// The graphql errors encountered, in resolution order.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub errors: Vec<Error>,

    /// The optional graphql extensions.
    #[serde(skip_serializing_if = "Object::is_empty", default)]
    pub extensions: Object,
}

/// How a request ended.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// Every selected field resolved.
    Success,
    /// Some fields resolved, others are reported in [`Response::errors`].
    PartialSuccess,
    /// Nothing was executed.
    Failure,
}

#[buildstructor::buildstructor]
impl Response {
    /// Constructor
    #[builder(visibility = "pub")]
    fn new(data: Option<Value>, errors: Vec<Error>, extensions: Map<ByteString, Value>) -> Self {
        Self {
            data,
            errors,
            extensions,
        }
    }

    pub fn outcome(&self) -> Outcome {
        match (&self.data, self.errors.is_empty()) {
            (None, _) => Outcome::Failure,
            (Some(_), true) => Outcome::Success,
            (Some(_), false) => Outcome::PartialSuccess,
        }
    }
}
