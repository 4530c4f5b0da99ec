use std::sync::Arc;

use async_trait::async_trait;
use graphql_resolver::configuration::Configuration;
use graphql_resolver::configuration::MissingUser;
use graphql_resolver::configuration::Users;
use graphql_resolver::graphql;
use graphql_resolver::graphql::Outcome;
use graphql_resolver::users;
use graphql_resolver::users::InMemoryProfileStore;
use graphql_resolver::users::InMemoryUserStore;
use graphql_resolver::users::ProfileStore;
use graphql_resolver::users::StoreError;
use graphql_resolver::users::UserRow;
use graphql_resolver::users::UserStore;
use graphql_resolver::Context;
use graphql_resolver::Engine;
use insta::assert_json_snapshot;
use serde_json_bytes::json;
use test_log::test;

fn engine(missing_user: MissingUser) -> Engine {
    users::engine(
        Configuration::builder()
            .users(Users::builder().missing_user(missing_user).build())
            .build(),
    )
    .unwrap()
}

fn context() -> Context {
    users::context(
        Arc::new(InMemoryUserStore::new([
            UserRow::new("alice", "true", "true"),
            UserRow::new("bob", "false", "true"),
        ])),
        Arc::new(InMemoryProfileStore::with_permissions(["read", "write"])),
    )
}

struct UnavailableUserStore;

#[async_trait]
impl UserStore for UnavailableUserStore {
    async fn find_by_login(&self, _login: &str) -> Result<Option<UserRow>, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
}

struct UnavailableProfileStore;

#[async_trait]
impl ProfileStore for UnavailableProfileStore {
    async fn fetch_profile(&self) -> Result<Option<users::Profile>, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
}

#[test(tokio::test)]
async fn declared_fields_resolve_without_errors() {
    let response = engine(MissingUser::ZeroValue)
        .execute(
            r#"{ hello user(login: "bob") { login admin active permissions } }"#,
            &context(),
        )
        .await;

    assert_eq!(response.outcome(), Outcome::Success);
    assert_json_snapshot!(response, @r#"
    {
      "data": {
        "hello": "world",
        "user": {
          "login": "bob",
          "admin": "false",
          "active": "true",
          "permissions": [
            "read",
            "write"
          ]
        }
      }
    }
    "#);
}

#[test(tokio::test)]
async fn alice_with_permissions() {
    let response = engine(MissingUser::ZeroValue)
        .execute(
            r#"{user(login:"alice"){login admin permissions}}"#,
            &context(),
        )
        .await;

    assert!(response.errors.is_empty());
    assert_eq!(
        response.data,
        Some(json!({
            "user": {
                "login": "alice",
                "admin": "true",
                "permissions": ["read", "write"]
            }
        }))
    );
}

#[test(tokio::test)]
async fn undeclared_fields_are_reported_once_each() {
    let response = engine(MissingUser::ZeroValue)
        .execute(
            r#"{ hello nope user(login: "alice") { login email } }"#,
            &context(),
        )
        .await;

    assert_eq!(response.outcome(), Outcome::PartialSuccess);
    assert_eq!(
        response.data,
        Some(json!({"hello": "world", "user": {"login": "alice"}}))
    );
    assert_json_snapshot!(response.errors, @r#"
    [
      {
        "message": "Cannot query field \"nope\" on type \"Query\"",
        "path": [
          "nope"
        ],
        "extensions": {
          "type": "Query",
          "field": "nope",
          "code": "INVALID_FIELD"
        }
      },
      {
        "message": "Cannot query field \"email\" on type \"User\"",
        "path": [
          "user",
          "email"
        ],
        "extensions": {
          "type": "User",
          "field": "email",
          "code": "INVALID_FIELD"
        }
      }
    ]
    "#);
}

#[test(tokio::test)]
async fn missing_required_argument() {
    let response = engine(MissingUser::ZeroValue)
        .execute("{ hello user { login } }", &context())
        .await;

    assert_eq!(response.data, Some(json!({"hello": "world"})));
    assert_eq!(response.errors.len(), 1);
    let error = &response.errors[0];
    assert_eq!(error.extension_code().as_deref(), Some("INVALID_ARGUMENT"));
    assert_eq!(
        error.path,
        Some(graphql::JsonPath::empty().join("user"))
    );
    assert_eq!(
        error.message,
        "Field \"Query.user\" argument \"login\" of type \"String!\" is required, but it was not provided"
    );
}

#[test(tokio::test)]
async fn malformed_requests_yield_a_single_parse_error() {
    for request in ["{ user(login: \"alice\") { login }", "}{", "query {", "{ user(login: ) }"] {
        let response = engine(MissingUser::ZeroValue)
            .execute(request, &context())
            .await;
        assert_eq!(response.outcome(), Outcome::Failure, "{request}");
        assert_eq!(response.data, None, "{request}");
        assert_eq!(response.errors.len(), 1, "{request}");
        assert_eq!(
            response.errors[0].extension_code().as_deref(),
            Some("PARSING_ERROR"),
            "{request}"
        );
    }
}

#[test(tokio::test)]
async fn repeated_fields_are_merged() {
    let response = engine(MissingUser::ZeroValue)
        .execute(
            r#"{ user(login: "alice") { login } user(login: "alice") { admin } }"#,
            &context(),
        )
        .await;

    assert_eq!(response.outcome(), Outcome::Success);
    assert_eq!(
        response.data,
        Some(json!({"user": {"login": "alice", "admin": "true"}}))
    );
}

#[test(tokio::test)]
async fn unknown_login_resolves_to_zero_value() {
    let response = engine(MissingUser::ZeroValue)
        .execute(r#"{user(login:"ghost"){login}}"#, &context())
        .await;

    assert!(response.errors.is_empty());
    assert_eq!(response.data, Some(json!({"user": {"login": ""}})));
}

#[test(tokio::test)]
async fn unknown_login_resolves_to_null_when_configured() {
    let response = engine(MissingUser::Null)
        .execute(r#"{user(login:"ghost"){login}}"#, &context())
        .await;

    assert!(response.errors.is_empty());
    assert_eq!(response.data, Some(json!({"user": null})));
}

#[test(tokio::test)]
async fn configuration_from_yaml() {
    let configuration = Configuration::from_yaml("users:\n  missing_user: \"null\"\n").unwrap();
    let response = users::engine(configuration)
        .unwrap()
        .execute(r#"{user(login:"ghost"){login}}"#, &context())
        .await;
    assert_eq!(response.data, Some(json!({"user": null})));
}

#[test(tokio::test)]
async fn resolution_is_repeatable() {
    let engine = engine(MissingUser::ZeroValue);
    let context = context();
    let request = r#"{ hello nope user(login: "alice") { login permissions } }"#;

    let first = engine.execute(request, &context).await;
    let second = engine.execute(request, &context).await;
    assert_eq!(first, second);
    assert_eq!(first.errors.len(), 1);
}

#[test(tokio::test)]
async fn aliases_directives_typename_and_variables() {
    let request = graphql::Request::builder()
        .query(
            r#"query User($login: String!, $withPermissions: Boolean = false, $other: String = "bob") {
                me: user(login: $login) {
                    __typename
                    name: login
                    permissions @include(if: $withPermissions)
                    admin @skip(if: true)
                }
                other: user(login: $other) { login }
                __typename
            }"#,
        )
        .operation_name("User")
        .variable("login", "alice")
        .build();

    let response = engine(MissingUser::ZeroValue)
        .execute(request, &context())
        .await;

    assert_eq!(response.outcome(), Outcome::Success);
    assert_eq!(
        response.data,
        Some(json!({
            "me": {"__typename": "User", "name": "alice"},
            "other": {"login": "bob"},
            "__typename": "Query"
        }))
    );
}

#[test(tokio::test)]
async fn failing_collaborators_are_localized() {
    let context = users::context(
        Arc::new(UnavailableUserStore),
        Arc::new(InMemoryProfileStore::with_permissions(["read"])),
    );
    let response = engine(MissingUser::ZeroValue)
        .execute(r#"{ hello user(login: "alice") { login } }"#, &context)
        .await;

    assert_eq!(response.data, Some(json!({"hello": "world"})));
    assert_json_snapshot!(response.errors, @r#"
    [
      {
        "message": "data source error: the store is unavailable: connection refused",
        "path": [
          "user"
        ],
        "extensions": {
          "code": "RESOLVER_ERROR"
        }
      }
    ]
    "#);

    let context = users::context(
        Arc::new(InMemoryUserStore::new([UserRow::new("alice", "true", "true")])),
        Arc::new(UnavailableProfileStore),
    );
    let response = engine(MissingUser::ZeroValue)
        .execute(r#"{ user(login: "alice") { login permissions } }"#, &context)
        .await;

    assert_eq!(response.data, Some(json!({"user": {"login": "alice"}})));
    assert_eq!(response.errors.len(), 1);
    assert_eq!(
        response.errors[0].path,
        Some(graphql::JsonPath::empty().join("user").join("permissions"))
    );
}

#[test(tokio::test)]
async fn missing_profile_resolves_to_null_permissions() {
    let context = users::context(
        Arc::new(InMemoryUserStore::new([UserRow::new("alice", "true", "true")])),
        Arc::new(InMemoryProfileStore::new(None)),
    );
    let response = engine(MissingUser::ZeroValue)
        .execute(r#"{ user(login: "alice") { permissions } }"#, &context)
        .await;

    assert_eq!(response.outcome(), Outcome::Success);
    assert_eq!(response.data, Some(json!({"user": {"permissions": null}})));
}

#[test(tokio::test)]
async fn concurrent_requests_share_the_engine() {
    let engine = Arc::new(engine(MissingUser::ZeroValue));
    let context = context();

    let handles = ["alice", "bob", "ghost"]
        .into_iter()
        .map(|login| {
            let engine = engine.clone();
            let context = context.clone();
            tokio::spawn(async move {
                let request = format!(r#"{{ user(login: "{login}") {{ login }} }}"#);
                (login, engine.execute(request, &context).await)
            })
        })
        .collect::<Vec<_>>();

    for handle in handles {
        let (login, response) = handle.await.unwrap();
        let expected = if login == "ghost" { "" } else { login };
        assert_eq!(
            response.data,
            Some(json!({"user": {"login": expected}}))
        );
    }
}
