use std::collections::HashMap;

use async_trait::async_trait;
use displaydoc::Display;
use parking_lot::RwLock;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::resolver::ResolverError;

/// A row of the `users` table.
///
/// The columns are read as text; a missing row maps to the all-empty row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct UserRow {
    pub login: String,
    pub admin: String,
    pub active: String,
}

impl UserRow {
    pub fn new(
        login: impl Into<String>,
        admin: impl Into<String>,
        active: impl Into<String>,
    ) -> Self {
        Self {
            login: login.into(),
            admin: admin.into(),
            active: active.into(),
        }
    }
}

/// A document of the profile store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// Data source errors.
#[derive(Error, Display, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StoreError {
    /// the store is unavailable: {0}
    Unavailable(String),
    /// query failed: {0}
    Query(String),
    /// invalid row: {0}
    InvalidRow(String),
}

impl From<StoreError> for ResolverError {
    fn from(error: StoreError) -> Self {
        ResolverError::DataSource(error.to_string())
    }
}

/// Looks up users by login.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Returns the row whose login matches, if any.
    async fn find_by_login(&self, login: &str) -> Result<Option<UserRow>, StoreError>;
}

/// Fetches the profile document holding the permissions.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Returns the first document of the collection, if any. No filter is applied.
    async fn fetch_profile(&self) -> Result<Option<Profile>, StoreError>;
}

/// A [`UserStore`] kept in memory.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    rows: RwLock<HashMap<String, UserRow>>,
}

impl InMemoryUserStore {
    pub fn new(rows: impl IntoIterator<Item = UserRow>) -> Self {
        Self {
            rows: RwLock::new(
                rows.into_iter()
                    .map(|row| (row.login.clone(), row))
                    .collect(),
            ),
        }
    }

    /// Adds or replaces the row with the same login.
    pub fn insert(&self, row: UserRow) {
        self.rows.write().insert(row.login.clone(), row);
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_login(&self, login: &str) -> Result<Option<UserRow>, StoreError> {
        Ok(self.rows.read().get(login).cloned())
    }
}

/// A [`ProfileStore`] kept in memory.
#[derive(Debug, Default)]
pub struct InMemoryProfileStore {
    profile: RwLock<Option<Profile>>,
}

impl InMemoryProfileStore {
    pub fn new(profile: Option<Profile>) -> Self {
        Self {
            profile: RwLock::new(profile),
        }
    }

    pub fn with_permissions<I, S>(permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Some(Profile {
            permissions: permissions.into_iter().map(Into::into).collect(),
        }))
    }

    pub fn set(&self, profile: Option<Profile>) {
        *self.profile.write() = profile;
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn fetch_profile(&self) -> Result<Option<Profile>, StoreError> {
        Ok(self.profile.read().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_user_store() {
        let store = InMemoryUserStore::new([UserRow::new("alice", "true", "true")]);
        assert_eq!(
            store.find_by_login("alice").await,
            Ok(Some(UserRow::new("alice", "true", "true")))
        );
        assert_eq!(store.find_by_login("ghost").await, Ok(None));

        store.insert(UserRow::new("alice", "false", "true"));
        assert_eq!(
            store.find_by_login("alice").await.unwrap().unwrap().admin,
            "false"
        );
    }

    #[tokio::test]
    async fn in_memory_profile_store() {
        let store = InMemoryProfileStore::with_permissions(["read", "write"]);
        assert_eq!(
            store.fetch_profile().await.unwrap().unwrap().permissions,
            ["read", "write"]
        );
        store.set(None);
        assert_eq!(store.fetch_profile().await, Ok(None));
    }

    #[test]
    fn store_errors_become_resolver_errors() {
        let error: ResolverError = StoreError::Unavailable("connection refused".to_string()).into();
        assert_eq!(
            error.to_string(),
            "data source error: the store is unavailable: connection refused"
        );
    }
}
