use apollo_parser::cst;
use serde::Deserialize;
use serde::Serialize;

use crate::json_ext::Value;
use crate::json_ext::ValueExt;
use crate::spec::SpecError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct InvalidValue;

/// The declared type of a field, an argument or a variable.
///
/// Built-in scalars get their own variant, every other name refers to an
/// object type registered in the [`Schema`](crate::spec::Schema).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    /// Named type {0}
    Named(String),
    /// List type {0}
    List(Box<FieldType>),
    /// Non null type {0}
    NonNull(Box<FieldType>),
    /// String
    String,
    /// Int
    Int,
    /// Float
    Float,
    /// Id
    Id,
    /// Boolean
    Boolean,
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldType::Named(ty) => write!(f, "{ty}"),
            FieldType::List(ty) => write!(f, "[{ty}]"),
            FieldType::NonNull(ty) => write!(f, "{ty}!"),
            FieldType::String => write!(f, "String"),
            FieldType::Int => write!(f, "Int"),
            FieldType::Float => write!(f, "Float"),
            FieldType::Id => write!(f, "ID"),
            FieldType::Boolean => write!(f, "Boolean"),
        }
    }
}

impl FieldType {
    /// A reference to the object type `name`.
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// A list of `inner`.
    pub fn list(inner: FieldType) -> Self {
        Self::List(Box::new(inner))
    }

    /// The non-null version of `inner`.
    pub fn non_null(inner: FieldType) -> Self {
        Self::NonNull(Box::new(inner))
    }

    fn from_name(name: &str) -> Self {
        match name {
            "String" => Self::String,
            "Int" => Self::Int,
            "Float" => Self::Float,
            "ID" => Self::Id,
            "Boolean" => Self::Boolean,
            _ => Self::Named(name.to_string()),
        }
    }

    // Validates an argument or variable value against the "input coercion" rules.
    // Object types are output types, so a named type never accepts an input value.
    pub(crate) fn validate_input_value(&self, value: &Value) -> Result<(), InvalidValue> {
        match (self, value) {
            (FieldType::NonNull(inner_ty), value) => {
                if value.is_null() {
                    Err(InvalidValue)
                } else {
                    inner_ty.validate_input_value(value)
                }
            }
            // NOTE: graphql's types are all optional by default
            (_, Value::Null) => Ok(()),
            (FieldType::String, Value::String(_)) => Ok(()),
            // Spec: https://spec.graphql.org/October2021/#sec-Int.Input-Coercion
            (FieldType::Int, maybe_int) if maybe_int.is_valid_int_input() => Ok(()),
            // Spec: https://spec.graphql.org/October2021/#sec-Float.Input-Coercion
            (FieldType::Float, maybe_float) if maybe_float.is_valid_float_input() => Ok(()),
            (FieldType::Id, Value::String(_)) => Ok(()),
            (FieldType::Id, maybe_int) if maybe_int.is_valid_int_input() => Ok(()),
            (FieldType::Boolean, Value::Bool(_)) => Ok(()),
            (FieldType::List(inner_ty), Value::Array(vec)) => vec
                .iter()
                .try_for_each(|x| inner_ty.validate_input_value(x)),
            // For coercion from single value to list
            (FieldType::List(inner_ty), val) => inner_ty.validate_input_value(val),
            _ => Err(InvalidValue),
        }
    }

    /// return the name of the type on which selections happen
    ///
    /// Example if we get the field `list: [User!]!`, it will return "User"
    pub fn inner_type_name(&self) -> Option<&str> {
        match self {
            FieldType::Named(name) => Some(name.as_str()),
            FieldType::List(inner) | FieldType::NonNull(inner) => inner.inner_type_name(),
            FieldType::String
            | FieldType::Int
            | FieldType::Float
            | FieldType::Id
            | FieldType::Boolean => None,
        }
    }

    pub(crate) fn is_builtin_scalar(&self) -> bool {
        match self {
            FieldType::Named(_) | FieldType::List(_) | FieldType::NonNull(_) => false,
            FieldType::String
            | FieldType::Int
            | FieldType::Float
            | FieldType::Id
            | FieldType::Boolean => true,
        }
    }

    pub fn is_non_null(&self) -> bool {
        matches!(self, FieldType::NonNull(_))
    }
}

impl TryFrom<cst::Type> for FieldType {
    type Error = SpecError;
    // Spec: https://spec.graphql.org/October2021/#sec-Type-References
    fn try_from(ty: cst::Type) -> Result<Self, Self::Error> {
        match ty {
            cst::Type::NamedType(named) => named.try_into(),
            cst::Type::ListType(list) => list.try_into(),
            cst::Type::NonNullType(non_null) => non_null.try_into(),
        }
    }
}

impl TryFrom<cst::NamedType> for FieldType {
    type Error = SpecError;
    fn try_from(named: cst::NamedType) -> Result<Self, Self::Error> {
        let name = named
            .name()
            .ok_or_else(|| SpecError::InvalidType("a type reference without a name".to_string()))?
            .text()
            .to_string();
        Ok(Self::from_name(&name))
    }
}

impl TryFrom<cst::ListType> for FieldType {
    type Error = SpecError;

    fn try_from(list: cst::ListType) -> Result<Self, Self::Error> {
        Ok(Self::list(
            list.ty()
                .ok_or_else(|| SpecError::InvalidType("a list without an item type".to_string()))?
                .try_into()?,
        ))
    }
}

impl TryFrom<cst::NonNullType> for FieldType {
    type Error = SpecError;

    fn try_from(non_null: cst::NonNullType) -> Result<Self, Self::Error> {
        if let Some(list) = non_null.list_type() {
            Ok(Self::non_null(list.try_into()?))
        } else if let Some(named) = non_null.named_type() {
            Ok(Self::non_null(named.try_into()?))
        } else {
            Err(SpecError::InvalidType(
                "a non null type without an inner type".to_string(),
            ))
        }
    }
}
