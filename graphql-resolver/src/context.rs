//! Execution context handed to every resolver.

use std::any::Any;
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::resolver::ResolverError;

type AnyMap = HashMap<TypeId, Arc<dyn Any + Send + Sync>>;

/// Read-only map of collaborator handles, keyed by type.
///
/// A `Context` is built once, before the first request, and shared across
/// concurrent executions. Cloning it is cheap.
///
/// For example:
/// `Context::builder().insert(store.clone()).build()`
#[derive(Clone, Default)]
pub struct Context {
    entries: Arc<AnyMap>,
}

impl Context {
    pub fn builder() -> ContextBuilder {
        ContextBuilder::default()
    }

    /// Returns the entry of type `T`, if present.
    pub fn get<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.entries
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.downcast_ref::<T>())
    }

    /// Like [`Context::get`], for use in resolvers.
    pub fn data<T: Any + Send + Sync>(&self) -> Result<&T, ResolverError> {
        self.get::<T>()
            .ok_or(ResolverError::MissingContextData(std::any::type_name::<T>()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("entries", &self.entries.len())
            .finish()
    }
}

#[derive(Default)]
pub struct ContextBuilder {
    entries: AnyMap,
}

impl ContextBuilder {
    /// Adds `value`, replacing a previous entry of the same type.
    pub fn insert<T: Any + Send + Sync>(mut self, value: T) -> Self {
        self.entries.insert(TypeId::of::<T>(), Arc::new(value));
        self
    }

    pub fn build(self) -> Context {
        Context {
            entries: Arc::new(self.entries),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Greeting(&'static str);

    #[test]
    fn typed_lookup() {
        let context = Context::builder()
            .insert(Greeting("hello"))
            .insert(42u32)
            .insert(Greeting("world"))
            .build();
        assert_eq!(context.len(), 2);
        assert_eq!(context.get::<Greeting>(), Some(&Greeting("world")));
        assert_eq!(context.data::<u32>(), Ok(&42));
        assert!(context.get::<String>().is_none());
        assert!(matches!(
            context.data::<String>(),
            Err(ResolverError::MissingContextData(_))
        ));
    }

    #[test]
    fn clones_share_entries() {
        let context = Context::builder().insert(Greeting("hello")).build();
        let clone = context.clone();
        assert_eq!(clone.get::<Greeting>(), Some(&Greeting("hello")));
        assert!(Context::default().is_empty());
    }
}
