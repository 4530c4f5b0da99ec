//! GraphQL schema.

use std::collections::HashSet;
use std::sync::Arc;

use derivative::Derivative;
use displaydoc::Display;
use indexmap::IndexMap;
use static_assertions::assert_impl_all;
use thiserror::Error;

use crate::json_ext::Value;
use crate::resolver::resolver_fn;
use crate::resolver::ResolveInfo;
use crate::resolver::Resolver;
use crate::resolver::ResolverError;
use crate::spec::FieldType;

/// An argument declared by a [`Field`].
///
/// A non-null argument type makes the argument required, unless it has a default value.
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    name: String,
    ty: FieldType,
    default_value: Option<Value>,
}

impl Argument {
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            default_value: None,
        }
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &FieldType {
        &self.ty
    }

    pub fn default(&self) -> Option<&Value> {
        self.default_value.as_ref()
    }

    pub(crate) fn is_required(&self) -> bool {
        self.ty.is_non_null() && self.default_value.is_none()
    }
}

/// A field of an [`ObjectType`].
///
/// Without a resolver, the field is read from its parent value under its own name.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct Field {
    name: String,
    ty: FieldType,
    arguments: Vec<Argument>,
    description: Option<String>,
    #[derivative(Debug = "ignore")]
    resolver: Option<Arc<dyn Resolver>>,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            arguments: Vec::new(),
            description: None,
            resolver: None,
        }
    }

    pub fn argument(mut self, argument: Argument) -> Self {
        self.arguments.push(argument);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_resolver(mut self, resolver: impl Resolver + 'static) -> Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    /// Resolves the field with a synchronous closure.
    pub fn resolve_with<F>(self, f: F) -> Self
    where
        F: Fn(&ResolveInfo<'_>) -> Result<Value, ResolverError> + Send + Sync + 'static,
    {
        self.with_resolver(resolver_fn(f))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &FieldType {
        &self.ty
    }

    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }

    pub fn get_argument(&self, name: &str) -> Option<&Argument> {
        self.arguments.iter().find(|argument| argument.name == name)
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn resolver(&self) -> Option<&dyn Resolver> {
        self.resolver.as_deref()
    }
}

/// A named object type.
#[derive(Debug, Clone)]
pub struct ObjectType {
    name: String,
    fields: IndexMap<String, Field>,
}

impl ObjectType {
    /// Defines an object type from its fields, in declaration order.
    pub fn define(
        name: impl Into<String>,
        fields: impl IntoIterator<Item = Field>,
    ) -> Result<Self, SchemaError> {
        let name = name.into();
        let mut by_name = IndexMap::new();
        for field in fields {
            let mut arguments = HashSet::new();
            for argument in &field.arguments {
                if !arguments.insert(argument.name.as_str()) {
                    return Err(SchemaError::DuplicateArgument {
                        type_name: name,
                        field: field.name.clone(),
                        argument: argument.name.clone(),
                    });
                }
                if !is_input_type(&argument.ty) {
                    return Err(SchemaError::InvalidArgumentType {
                        type_name: name,
                        field: field.name.clone(),
                        argument: argument.name.clone(),
                        ty: argument.ty.to_string(),
                    });
                }
                if let Some(default) = &argument.default_value {
                    if argument.ty.validate_input_value(default).is_err() {
                        return Err(SchemaError::InvalidDefaultValue {
                            type_name: name,
                            field: field.name.clone(),
                            argument: argument.name.clone(),
                        });
                    }
                }
            }
            if by_name.contains_key(&field.name) {
                return Err(SchemaError::DuplicateField {
                    type_name: name,
                    field: field.name.clone(),
                });
            }
            by_name.insert(field.name.clone(), field);
        }
        Ok(Self {
            name,
            fields: by_name,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.values()
    }
}

// Arguments accept a built-in scalar, or a non-null built-in scalar.
fn is_input_type(ty: &FieldType) -> bool {
    match ty {
        FieldType::NonNull(inner) => inner.is_builtin_scalar(),
        _ => ty.is_builtin_scalar(),
    }
}

assert_impl_all!(Schema: Send, Sync);

/// The registry of object types, rooted at the query type.
///
/// Immutable once built, shared between concurrent executions.
#[derive(Debug, Clone)]
pub struct Schema {
    query_type: ObjectType,
    object_types: IndexMap<String, ObjectType>,
}

#[buildstructor::buildstructor]
impl Schema {
    #[builder(visibility = "pub")]
    fn new(query: Option<ObjectType>, object_types: Vec<ObjectType>) -> Result<Self, SchemaError> {
        let query_type = query.ok_or(SchemaError::MissingRootQuery)?;

        let mut by_name = IndexMap::new();
        for object_type in object_types {
            if object_type.name == query_type.name || by_name.contains_key(&object_type.name) {
                return Err(SchemaError::DuplicateType(object_type.name));
            }
            by_name.insert(object_type.name.clone(), object_type);
        }

        let schema = Self {
            query_type,
            object_types: by_name,
        };
        for object_type in schema.object_types() {
            for field in object_type.fields() {
                if let Some(referenced) = field.ty.inner_type_name() {
                    if schema.object_type(referenced).is_none() {
                        return Err(SchemaError::UnknownType {
                            type_name: object_type.name.clone(),
                            field: field.name.clone(),
                            referenced: referenced.to_string(),
                        });
                    }
                }
            }
        }
        Ok(schema)
    }

    /// The root query type.
    pub fn query_type(&self) -> &ObjectType {
        &self.query_type
    }

    pub fn object_type(&self, name: &str) -> Option<&ObjectType> {
        if self.query_type.name == name {
            Some(&self.query_type)
        } else {
            self.object_types.get(name)
        }
    }

    /// Every object type, the root query type first.
    pub fn object_types(&self) -> impl Iterator<Item = &ObjectType> {
        std::iter::once(&self.query_type).chain(self.object_types.values())
    }
}

/// Errors raised while building a [`Schema`].
#[derive(Error, Debug, Display, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SchemaError {
    /// the schema does not define a root query type
    MissingRootQuery,
    /// type '{0}' is defined more than once
    DuplicateType(String),
    /// field '{field}' is defined more than once on type '{type_name}'
    DuplicateField { type_name: String, field: String },
    /// argument '{argument}' is defined more than once on field '{type_name}.{field}'
    DuplicateArgument {
        type_name: String,
        field: String,
        argument: String,
    },
    /// field '{type_name}.{field}' references unknown type '{referenced}'
    UnknownType {
        type_name: String,
        field: String,
        referenced: String,
    },
    /// argument '{argument}' of field '{type_name}.{field}' has type '{ty}', which is not an input type
    InvalidArgumentType {
        type_name: String,
        field: String,
        argument: String,
        ty: String,
    },
    /// the default value of argument '{argument}' of field '{type_name}.{field}' does not match its type
    InvalidDefaultValue {
        type_name: String,
        field: String,
        argument: String,
    },
}
