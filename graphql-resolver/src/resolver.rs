//! Field resolvers.

use std::fmt;

use async_trait::async_trait;
use displaydoc::Display;
use thiserror::Error;

use crate::context::Context;
use crate::json_ext::Object;
use crate::json_ext::Path;
use crate::json_ext::Value;

/// Everything a [`Resolver`] gets to see about the field being resolved.
pub struct ResolveInfo<'a> {
    pub(crate) context: &'a Context,
    pub(crate) source: &'a Value,
    pub(crate) arguments: &'a Object,
    pub(crate) field_name: &'a str,
    pub(crate) parent_type: &'a str,
    pub(crate) path: &'a Path,
}

impl<'a> ResolveInfo<'a> {
    /// The execution context shared by every field of the request.
    pub fn context(&self) -> &'a Context {
        self.context
    }

    /// The value the parent field resolved to. `null` for root fields.
    pub fn source(&self) -> &'a Value {
        self.source
    }

    /// Bound and coerced arguments, declared defaults included.
    pub fn arguments(&self) -> &'a Object {
        self.arguments
    }

    pub fn argument(&self, name: &str) -> Option<&'a Value> {
        self.arguments.get(name)
    }

    /// Returns a string argument, or an error if it is absent or not a string.
    pub fn argument_str(&self, name: &'static str) -> Result<&'a str, ResolverError> {
        self.arguments
            .get(name)
            .and_then(|value| value.as_str())
            .ok_or(ResolverError::MissingArgument(name))
    }

    pub fn field_name(&self) -> &'a str {
        self.field_name
    }

    /// Name of the object type the field belongs to.
    pub fn parent_type(&self) -> &'a str {
        self.parent_type
    }

    /// Response path of the field being resolved.
    pub fn path(&self) -> &'a Path {
        self.path
    }
}

impl fmt::Debug for ResolveInfo<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolveInfo")
            .field("parent_type", &self.parent_type)
            .field("field_name", &self.field_name)
            .field("path", &self.path)
            .field("arguments", &self.arguments)
            .finish()
    }
}

/// Computes the value of a field.
///
/// The returned value is completed against the declared type of the field:
/// object values become the source of the nested selection, lists are
/// completed element by element and scalars are checked strictly.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, info: &ResolveInfo<'_>) -> Result<Value, ResolverError>;
}

/// Resolver failures, reported as field errors.
#[derive(Error, Debug, Display, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ResolverError {
    /// {0}
    Message(String),
    /// missing argument '{0}'
    MissingArgument(&'static str),
    /// the execution context does not contain {0}
    MissingContextData(&'static str),
    /// data source error: {0}
    DataSource(String),
}

impl ResolverError {
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

/// A [`Resolver`] wrapping a synchronous closure.
pub struct FnResolver<F>(F);

/// Wraps `f` into a [`Resolver`].
pub fn resolver_fn<F>(f: F) -> FnResolver<F>
where
    F: Fn(&ResolveInfo<'_>) -> Result<Value, ResolverError> + Send + Sync,
{
    FnResolver(f)
}

#[async_trait]
impl<F> Resolver for FnResolver<F>
where
    F: Fn(&ResolveInfo<'_>) -> Result<Value, ResolverError> + Send + Sync,
{
    async fn resolve(&self, info: &ResolveInfo<'_>) -> Result<Value, ResolverError> {
        (self.0)(info)
    }
}
