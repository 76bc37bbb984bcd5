use async_trait::async_trait;
use time::{Duration, OffsetDateTime};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::repo::{StoreError, UserStore};
use super::repo_types::{UserFields, UserRecord};

/// Process-local store. Records are kept in insertion order; every
/// operation holds the lock for its whole read-check-write step, so the
/// email uniqueness check and the write are atomic.
#[derive(Default)]
pub struct InMemoryUserStore {
    users: Mutex<Vec<UserRecord>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn email_taken(users: &[UserRecord], email: &str, except: Option<Uuid>) -> bool {
    users
        .iter()
        .any(|u| u.email == email && Some(u.id) != except)
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn list(&self) -> Result<Vec<UserRecord>, StoreError> {
        Ok(self.users.lock().await.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<UserRecord, StoreError> {
        self.users
            .lock()
            .await
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn insert(&self, fields: UserFields) -> Result<UserRecord, StoreError> {
        let mut users = self.users.lock().await;
        if email_taken(&users, &fields.email, None) {
            return Err(StoreError::DuplicateKey);
        }

        let now = OffsetDateTime::now_utc();
        let user = UserRecord {
            id: Uuid::new_v4(),
            username: fields.username,
            email: fields.email,
            phone: fields.phone,
            address: fields.address,
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn replace(&self, id: Uuid, fields: UserFields) -> Result<UserRecord, StoreError> {
        let mut users = self.users.lock().await;
        let idx = users
            .iter()
            .position(|u| u.id == id)
            .ok_or(StoreError::NotFound)?;
        if email_taken(&users, &fields.email, Some(id)) {
            return Err(StoreError::DuplicateKey);
        }

        let user = &mut users[idx];
        // strictly later than the previous stamp, even within one clock tick
        let now = OffsetDateTime::now_utc();
        let floor = user.updated_at + Duration::microseconds(1);
        user.updated_at = if now > floor { now } else { floor };
        user.username = fields.username;
        user.email = fields.email;
        user.phone = fields.phone;
        user.address = fields.address;
        Ok(user.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<UserRecord, StoreError> {
        let mut users = self.users.lock().await;
        let idx = users
            .iter()
            .position(|u| u.id == id)
            .ok_or(StoreError::NotFound)?;
        Ok(users.remove(idx))
    }
}
