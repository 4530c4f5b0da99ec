use derivative::Derivative;
use serde::Deserialize;
use serde::Serialize;
use serde_json_bytes::ByteString;
use serde_json_bytes::Map as JsonMap;
use serde_json_bytes::Value;

use crate::json_ext::Object;

/// A GraphQL `Request` to be resolved against a schema.
#[derive(Clone, Derivative, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
#[derivative(Debug, PartialEq, Eq)]
#[non_exhaustive]
pub struct Request {
    /// The GraphQL operation string.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub query: Option<String>,

    /// The (optional) GraphQL operation name.
    ///
    /// When specified, this name must match the name of an operation in the
    /// GraphQL document.  When excluded, there must exist only a single
    /// operation in the GraphQL document.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub operation_name: Option<String>,

    /// The (optional) GraphQL variables in the form of a JSON object.
    ///
    /// When specified, these variables can be referred to in the `query` by
    /// using `$variableName` syntax, where `{"variableName": "value"}` has been
    /// specified as this `variables` value.
    #[serde(
        skip_serializing_if = "Object::is_empty",
        default,
        deserialize_with = "deserialize_null_default"
    )]
    pub variables: Object,
}

// NOTE: this deserialize helper is used to transform `null` to Default::default()
fn deserialize_null_default<'de, D, T: Default + Deserialize<'de>>(
    deserializer: D,
) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
{
    <Option<T>>::deserialize(deserializer).map(|x| x.unwrap_or_default())
}

#[buildstructor::buildstructor]
impl Request {
    #[builder(visibility = "pub")]
    /// This is the constructor (or builder) to use when constructing a GraphQL
    /// `Request`.
    fn new(
        query: Option<String>,
        operation_name: Option<String>,
        // Skip the `Object` type alias in order to use buildstructor's map special-casing
        variables: JsonMap<ByteString, Value>,
    ) -> Self {
        Self {
            query,
            operation_name,
            variables,
        }
    }
}

impl From<&str> for Request {
    fn from(query: &str) -> Self {
        Request::builder().query(query).build()
    }
}

impl From<String> for Request {
    fn from(query: String) -> Self {
        Request::builder().query(query).build()
    }
}

#[cfg(test)]
mod tests {
    use serde_json_bytes::json;

    use super::*;

    #[test]
    fn test_request() {
        let data = json!({
          "query": "query aTest($login: String!) { user(login: $login) { login } }",
          "operationName": "aTest",
          "variables": { "login": "alice" }
        });
        let result: Request = serde_json_bytes::from_value(data).unwrap();
        assert_eq!(
            result,
            Request::builder()
                .query("query aTest($login: String!) { user(login: $login) { login } }")
                .operation_name("aTest")
                .variable("login", "alice")
                .build()
        );
    }

    #[test]
    fn test_null_variables() {
        let result: Request = serde_json_bytes::from_value(json!({
          "query": "{ hello }",
          "variables": null,
        }))
        .unwrap();
        assert_eq!(result, Request::from("{ hello }"));
    }
}
