use async_trait::async_trait;
use sqlx::PgPool;

use super::store::StoreError;
use super::store::UserRow;
use super::store::UserStore;

const FIND_BY_LOGIN: &str = "SELECT username AS login, admin::text AS admin, active::text AS active \
     FROM users WHERE username = $1 LIMIT 1";

/// A [`UserStore`] reading the `users` table of a Postgres database.
///
/// The pool is managed by the caller.
#[derive(Debug, Clone)]
pub struct PostgresUserStore {
    pool: PgPool,
}

impl PostgresUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PostgresUserStore {
    async fn find_by_login(&self, login: &str) -> Result<Option<UserRow>, StoreError> {
        sqlx::query_as::<_, UserRow>(FIND_BY_LOGIN)
            .bind(login)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from)
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(error.to_string())
            }
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::ColumnNotFound(_) => {
                StoreError::InvalidRow(error.to_string())
            }
            _ => StoreError::Query(error.to_string()),
        }
    }
}
