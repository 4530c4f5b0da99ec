//! The users schema.
//!
//! ```graphql
//! type Query {
//!   hello: String
//!   user(login: String!): User
//! }
//!
//! type User {
//!   login: String
//!   admin: String
//!   active: String
//!   permissions: [String]
//! }
//! ```
//!
//! Users are read from a [`UserStore`], permissions from a [`ProfileStore`].
//! Both are looked up in the execution [`Context`], see [`context`].

#[cfg(feature = "postgres")]
mod postgres;
mod store;

use std::sync::Arc;

use async_trait::async_trait;
#[cfg(feature = "postgres")]
pub use postgres::PostgresUserStore;
use serde_json_bytes::json;
pub use store::InMemoryProfileStore;
pub use store::InMemoryUserStore;
pub use store::Profile;
pub use store::ProfileStore;
pub use store::StoreError;
pub use store::UserRow;
pub use store::UserStore;

use crate::configuration::Configuration;
use crate::configuration::MissingUser;
use crate::context::Context;
use crate::execution::Engine;
use crate::json_ext::Value;
use crate::resolver::ResolveInfo;
use crate::resolver::Resolver;
use crate::resolver::ResolverError;
use crate::spec::Argument;
use crate::spec::Field;
use crate::spec::FieldType;
use crate::spec::ObjectType;
use crate::spec::Schema;
use crate::spec::SchemaError;

pub const USER_TYPE_NAME: &str = "User";
pub const QUERY_TYPE_NAME: &str = "Query";

/// Builds the users schema. `configuration.users` decides what a login without a row resolves to.
pub fn schema(configuration: &Configuration) -> Result<Schema, SchemaError> {
    let user = ObjectType::define(
        USER_TYPE_NAME,
        [
            Field::new("login", FieldType::String),
            Field::new("admin", FieldType::String),
            Field::new("active", FieldType::String),
            Field::new("permissions", FieldType::list(FieldType::String))
                .with_description("Permissions of the profile document")
                .with_resolver(PermissionsResolver),
        ],
    )?;

    let query = ObjectType::define(
        QUERY_TYPE_NAME,
        [
            Field::new("hello", FieldType::String).resolve_with(|info| {
                tracing::debug!(arguments = ?info.arguments(), "hello");
                Ok(json!("world"))
            }),
            Field::new("user", FieldType::named(USER_TYPE_NAME))
                .argument(Argument::new("login", FieldType::non_null(FieldType::String)))
                .with_description("Looks a user up by login")
                .with_resolver(UserResolver {
                    missing_user: configuration.users.missing_user,
                }),
        ],
    )?;

    Schema::builder().query(query).object_type(user).build()
}

/// Builds an [`Engine`] serving the users schema.
pub fn engine(configuration: Configuration) -> Result<Engine, SchemaError> {
    let schema = schema(&configuration)?;
    Ok(Engine::builder()
        .schema(schema)
        .configuration(configuration)
        .build())
}

/// The execution context expected by the users schema.
pub fn context(users: Arc<dyn UserStore>, profiles: Arc<dyn ProfileStore>) -> Context {
    Context::builder().insert(users).insert(profiles).build()
}

struct UserResolver {
    missing_user: MissingUser,
}

#[async_trait]
impl Resolver for UserResolver {
    async fn resolve(&self, info: &ResolveInfo<'_>) -> Result<Value, ResolverError> {
        let login = info.argument_str("login")?;
        let store = info.context().data::<Arc<dyn UserStore>>()?;

        let row = match store.find_by_login(login).await? {
            Some(row) => row,
            None => {
                tracing::debug!(login, "no user found");
                match self.missing_user {
                    MissingUser::ZeroValue => UserRow::default(),
                    MissingUser::Null => return Ok(Value::Null),
                }
            }
        };
        serde_json_bytes::to_value(row).map_err(|err| ResolverError::Message(err.to_string()))
    }
}

struct PermissionsResolver;

#[async_trait]
impl Resolver for PermissionsResolver {
    async fn resolve(&self, info: &ResolveInfo<'_>) -> Result<Value, ResolverError> {
        let store = info.context().data::<Arc<dyn ProfileStore>>()?;
        Ok(match store.fetch_profile().await? {
            Some(profile) => Value::Array(
                profile
                    .permissions
                    .into_iter()
                    .map(|permission| permission.into())
                    .collect(),
            ),
            None => Value::Null,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn users_schema() {
        let schema = schema(&Configuration::default()).unwrap();
        assert_eq!(schema.query_type().name(), "Query");

        let user = schema.query_type().field("user").unwrap();
        assert_eq!(user.ty(), &FieldType::named("User"));
        assert_eq!(user.arguments().len(), 1);
        assert_eq!(user.arguments()[0].ty().to_string(), "String!");
        assert!(user.resolver().is_some());
        assert_eq!(user.description(), Some("Looks a user up by login"));
        assert_eq!(schema.query_type().field("hello").unwrap().description(), None);

        let user_type = schema.object_type("User").unwrap();
        assert_eq!(
            user_type.fields().map(Field::name).collect::<Vec<_>>(),
            ["login", "admin", "active", "permissions"]
        );
        assert!(user_type.field("login").unwrap().resolver().is_none());
    }

    #[tokio::test]
    async fn missing_stores_are_resolver_errors() {
        let engine = engine(Configuration::default()).unwrap();
        let response = engine
            .execute(r#"{ hello user(login: "alice") { login } }"#, &Context::default())
            .await;
        assert_eq!(response.data, Some(json!({"hello": "world"})));
        assert_eq!(response.errors.len(), 1);
        assert_eq!(
            response.errors[0].extension_code().as_deref(),
            Some("RESOLVER_ERROR")
        );
        assert!(response.errors[0]
            .message
            .starts_with("the execution context does not contain"));
    }
}
