use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::users::repo_types::{UserFields, UserRecord};

/// Request body for create and update.
///
/// Fields are optional here so that absence is reported as
/// [`ApiError::MissingFields`] rather than as a body decoding failure.
#[derive(Debug, Default, Deserialize)]
pub struct UserPayload {
    pub username: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl UserPayload {
    /// Presence check only; `address` defaults to an empty string.
    pub fn into_fields(self) -> Result<UserFields, ApiError> {
        match (
            present(self.username),
            present(self.email),
            present(self.phone),
        ) {
            (Some(username), Some(email), Some(phone)) => Ok(UserFields {
                username,
                email,
                phone,
                address: self.address.unwrap_or_default(),
            }),
            _ => Err(ApiError::MissingFields),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub success: bool,
    pub users: Vec<UserRecord>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub success: bool,
    pub user: UserRecord,
}

#[derive(Debug, Serialize)]
pub struct DeletedUserResponse {
    pub success: bool,
    pub message: String,
    pub user: UserRecord,
}
