use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::users::dto::UserPayload;
use crate::users::repo::{StoreError, UserStore};
use crate::users::repo_types::UserRecord;

/// Validate the textual form of a record identifier before any store call.
pub fn parse_user_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::try_parse(raw).map_err(|_| {
        warn!(id = raw, "invalid user id");
        ApiError::InvalidIdentifier
    })
}

/// Translate a store outcome into an API failure. Causes of unexpected
/// failures are logged here and replaced with `internal`.
fn map_store_error(err: StoreError, internal: &'static str) -> ApiError {
    match err {
        StoreError::DuplicateKey => ApiError::DuplicateEmail,
        StoreError::NotFound => ApiError::NotFound,
        StoreError::Other(e) => {
            error!(error = ?e, "{internal}");
            ApiError::Internal(internal)
        }
    }
}

pub async fn list_users(store: &dyn UserStore) -> Result<Vec<UserRecord>, ApiError> {
    store
        .list()
        .await
        .map_err(|e| map_store_error(e, "Failed to fetch users"))
}

pub async fn get_user(store: &dyn UserStore, raw_id: &str) -> Result<UserRecord, ApiError> {
    let id = parse_user_id(raw_id)?;
    store
        .find_by_id(id)
        .await
        .map_err(|e| map_store_error(e, "Failed to fetch user"))
}

pub async fn create_user(
    store: &dyn UserStore,
    payload: UserPayload,
) -> Result<UserRecord, ApiError> {
    let fields = payload.into_fields()?;
    let user = store
        .insert(fields)
        .await
        .map_err(|e| map_store_error(e, "Failed to create user"))?;
    info!(user_id = %user.id, email = %user.email, "user created");
    Ok(user)
}

/// Identifier is validated before the body, so a bad id wins over a bad body.
pub async fn update_user(
    store: &dyn UserStore,
    raw_id: &str,
    payload: Result<UserPayload, ApiError>,
) -> Result<UserRecord, ApiError> {
    let id = parse_user_id(raw_id)?;
    let fields = payload?.into_fields()?;
    let user = store
        .replace(id, fields)
        .await
        .map_err(|e| map_store_error(e, "Failed to update user"))?;
    info!(user_id = %user.id, "user updated");
    Ok(user)
}

pub async fn delete_user(store: &dyn UserStore, raw_id: &str) -> Result<UserRecord, ApiError> {
    let id = parse_user_id(raw_id)?;
    let user = store
        .delete(id)
        .await
        .map_err(|e| map_store_error(e, "Failed to delete user"))?;
    info!(user_id = %user.id, "user deleted");
    Ok(user)
}
