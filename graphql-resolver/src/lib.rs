//! A GraphQL field-resolution engine.
//!
//! A [`Schema`] declares object types, their fields, argument contracts and
//! resolvers. An [`Engine`] parses request strings against it and resolves the
//! selected fields into a [`graphql::Response`]. The [`users`] module wires the
//! engine to a user table and a profile document store.

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

#[macro_use]
pub mod json_ext;

pub mod configuration;
mod context;
pub mod error;
mod execution;
pub mod graphql;
mod resolver;
pub mod spec;
pub mod users;

pub use configuration::Configuration;
pub use context::Context;
pub use context::ContextBuilder;
pub use execution::execute;
pub use execution::Engine;
pub use resolver::resolver_fn;
pub use resolver::FnResolver;
pub use resolver::ResolveInfo;
pub use resolver::Resolver;
pub use resolver::ResolverError;
pub use spec::Schema;
