//! JSON helpers shared by the execution engine and the response types.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json_bytes::ByteString;
use serde_json_bytes::Map;
pub use serde_json_bytes::Value;

/// A JSON object.
pub type Object = Map<ByteString, Value>;

/// A path element in a GraphQL response.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathElement {
    /// An index path element.
    Index(usize),

    /// A key path element: the response key of a field (its alias, or its name).
    Key(String),
}

/// A path into the result document.
///
/// This can be composed of response keys and list indices.
#[derive(Clone, Default, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(pub Vec<PathElement>);

impl Path {
    pub fn empty() -> Path {
        Path(Vec::new())
    }

    pub fn last(&self) -> Option<&PathElement> {
        self.0.last()
    }

    /// Returns a new path with `element` appended.
    pub fn join(&self, element: impl Into<PathElement>) -> Self {
        let mut elements = Vec::with_capacity(self.0.len() + 1);
        elements.extend(self.0.iter().cloned());
        elements.push(element.into());
        Path(elements)
    }
}

impl From<&str> for PathElement {
    fn from(key: &str) -> Self {
        PathElement::Key(key.to_string())
    }
}

impl From<String> for PathElement {
    fn from(key: String) -> Self {
        PathElement::Key(key)
    }
}

impl From<usize> for PathElement {
    fn from(index: usize) -> Self {
        PathElement::Index(index)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for element in &self.0 {
            write!(f, "/")?;
            match element {
                PathElement::Index(index) => write!(f, "{index}")?,
                PathElement::Key(key) => write!(f, "{key}")?,
            }
        }
        Ok(())
    }
}

/// Extension trait for [`serde_json_bytes::Value`].
pub trait ValueExt {
    /// Returns `true` if the value can be coerced to a GraphQL `Int` input.
    ///
    /// Spec: https://spec.graphql.org/October2021/#sec-Int.Input-Coercion
    fn is_valid_int_input(&self) -> bool;

    /// Returns `true` if the value can be coerced to a GraphQL `Float` input.
    ///
    /// Spec: https://spec.graphql.org/October2021/#sec-Float.Input-Coercion
    fn is_valid_float_input(&self) -> bool;

    /// A short description of the JSON kind of this value, for error messages.
    fn kind(&self) -> &'static str;

    /// Merges `other` into `self`: objects are merged key by key, lists item by item,
    /// anything else is replaced.
    fn deep_merge(&mut self, other: Self);
}

impl ValueExt for Value {
    fn is_valid_int_input(&self) -> bool {
        // Integers outside of the signed 32-bit range are rejected
        self.as_i64()
            .map(|i| i32::try_from(i).is_ok())
            .unwrap_or(false)
    }

    fn is_valid_float_input(&self) -> bool {
        // Int values are accepted for Float inputs
        self.is_f64() || self.is_i64() || self.is_u64()
    }

    fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "list",
            Value::Object(_) => "object",
        }
    }

    fn deep_merge(&mut self, other: Self) {
        match (self, other) {
            (Value::Object(a), Value::Object(b)) => {
                for (key, value) in b {
                    match a.get_mut(&key) {
                        Some(existing) => existing.deep_merge(value),
                        None => {
                            a.insert(key, value);
                        }
                    }
                }
            }
            (Value::Array(a), Value::Array(b)) => {
                let mut b = b.into_iter();
                for (a, b) in a.iter_mut().zip(b.by_ref()) {
                    a.deep_merge(b);
                }
                a.extend(b);
            }
            (a, b) => *a = b,
        }
    }
}

/// Makes sure the value is an object, or returns an error naming its actual kind.
macro_rules! ensure_object {
    ($value:expr) => {{
        match $value {
            $crate::json_ext::Value::Object(o) => Ok(o),
            other => Err(format!(
                "expected an object, found a {}",
                $crate::json_ext::ValueExt::kind(&other)
            )),
        }
    }};
}
