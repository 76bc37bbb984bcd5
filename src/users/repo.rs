use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use super::repo_types::{UserFields, UserRecord};

/// Outcomes of a store call that the API layer distinguishes.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A unique index (the one on `email`) rejected the write.
    #[error("duplicate key")]
    DuplicateKey,

    #[error("record not found")]
    NotFound,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Persistence port for user records.
///
/// Implementations must enforce email uniqueness atomically and perform
/// `replace`/`delete` as single find-and-modify steps.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn list(&self) -> Result<Vec<UserRecord>, StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<UserRecord, StoreError>;
    async fn insert(&self, fields: UserFields) -> Result<UserRecord, StoreError>;
    /// Overwrites all four mutable fields and returns the post-update record.
    async fn replace(&self, id: Uuid, fields: UserFields) -> Result<UserRecord, StoreError>;
    /// Removes the record and returns its last state.
    async fn delete(&self, id: Uuid) -> Result<UserRecord, StoreError>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn list(&self) -> Result<Vec<UserRecord>, StoreError> {
        let rows = sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT id, username, email, phone, address, created_at, updated_at
            FROM users
            "#,
        )
        .fetch_all(&self.db)
        .await
        .map_err(|e| map_sqlx_error(e, "list users"))?;
        Ok(rows)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<UserRecord, StoreError> {
        sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT id, username, email, phone, address, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| map_sqlx_error(e, "find user by id"))?
        .ok_or(StoreError::NotFound)
    }

    async fn insert(&self, fields: UserFields) -> Result<UserRecord, StoreError> {
        let user = sqlx::query_as::<_, UserRecord>(
            r#"
            INSERT INTO users (id, username, email, phone, address)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, username, email, phone, address, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&fields.username)
        .bind(&fields.email)
        .bind(&fields.phone)
        .bind(&fields.address)
        .fetch_one(&self.db)
        .await
        .map_err(|e| map_sqlx_error(e, "insert user"))?;
        Ok(user)
    }

    async fn replace(&self, id: Uuid, fields: UserFields) -> Result<UserRecord, StoreError> {
        // updated_at must move strictly forward even if now() has not advanced
        sqlx::query_as::<_, UserRecord>(
            r#"
            UPDATE users
               SET username = $2,
                   email = $3,
                   phone = $4,
                   address = $5,
                   updated_at = GREATEST(now(), updated_at + interval '1 microsecond')
             WHERE id = $1
            RETURNING id, username, email, phone, address, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&fields.username)
        .bind(&fields.email)
        .bind(&fields.phone)
        .bind(&fields.address)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| map_sqlx_error(e, "update user"))?
        .ok_or(StoreError::NotFound)
    }

    async fn delete(&self, id: Uuid) -> Result<UserRecord, StoreError> {
        sqlx::query_as::<_, UserRecord>(
            r#"
            DELETE FROM users
             WHERE id = $1
            RETURNING id, username, email, phone, address, created_at, updated_at
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| map_sqlx_error(e, "delete user"))?
        .ok_or(StoreError::NotFound)
    }
}

/// Map sqlx failures onto the closed [`StoreError`] set.
fn map_sqlx_error(error: sqlx::Error, op: &'static str) -> StoreError {
    match &error {
        sqlx::Error::Database(db_err) => {
            debug!(op, code = ?db_err.code(), message = db_err.message(), "database error");
        }
        _ => debug!(op, error = %error, "sqlx operation failed"),
    }

    match error {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => StoreError::DuplicateKey,
        sqlx::Error::RowNotFound => StoreError::NotFound,
        other => StoreError::Other(anyhow::Error::new(other).context(op)),
    }
}
