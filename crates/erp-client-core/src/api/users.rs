//! User resource operations.

use tracing::debug;

use super::client::ApiClient;
use super::request::RequestDescriptor;
use super::ApiError;
use crate::models::{NewUser, UserCount, UserId, UserList, UserRecord, UserUpdate};

pub const REGISTER_PATH: &str = "/api/v1/users/register";
pub const PROFILE_PATH: &str = "/api/v1/users/profile";
pub const USERS_PATH: &str = "/api/v1/users";
pub const COUNT_PATH: &str = "/api/v1/users/count";

/// Path for a single user. Ids that would escape the path segment are
/// rejected before anything is sent.
fn user_path(id: &UserId) -> Result<String, ApiError> {
    let id = id.to_string();
    if !is_single_segment(&id) {
        return Err(ApiError::InvalidRequest(format!("Invalid user id: {:?}", id)));
    }
    Ok(format!("{}/{}", USERS_PATH, id))
}

/// URL parsing resolves dot segments (including `%2e` forms), treats `\`
/// as `/` and strips tabs and newlines, so any of those could move the
/// request off `/users/{id}`.
fn is_single_segment(id: &str) -> bool {
    !id.is_empty()
        && id != "."
        && id != ".."
        && !id
            .chars()
            .any(|c| matches!(c, '/' | '\\' | '?' | '#' | '%') || c.is_whitespace() || c.is_control())
}

impl ApiClient {
    pub async fn register_user(&self, user: &NewUser) -> Result<UserRecord, ApiError> {
        let descriptor = RequestDescriptor::post(REGISTER_PATH).json(user)?;
        let response = self.send(&descriptor).await?;
        Self::decode(response, "Registration failed")
    }

    /// Fetch the authenticated user's profile and refresh the cached record
    pub async fn get_user_profile(&self) -> Result<UserRecord, ApiError> {
        let response = self.send(&RequestDescriptor::get(PROFILE_PATH)).await?;
        let user: UserRecord = Self::decode(response, "Failed to get user profile")?;
        self.credentials().set_user(&user);
        Ok(user)
    }

    pub async fn update_user(&self, id: &UserId, update: &UserUpdate) -> Result<UserRecord, ApiError> {
        let descriptor = RequestDescriptor::put(user_path(id)?).json(update)?;
        let response = self.send(&descriptor).await?;
        Self::decode(response, "Update failed")
    }

    pub async fn delete_user(&self, id: &UserId) -> Result<(), ApiError> {
        let response = self.send(&RequestDescriptor::delete(user_path(id)?)).await?;
        Self::ensure_success(&response, "Failed to delete user")?;
        debug!(user_id = %id, "User deleted");
        Ok(())
    }

    /// One page of users plus the total; pagination math is up to the caller
    pub async fn list_users(&self, limit: u32, offset: u32) -> Result<UserList, ApiError> {
        let path = format!("{}?limit={}&offset={}", USERS_PATH, limit, offset);
        let response = self.send(&RequestDescriptor::get(path)).await?;
        Self::decode(response, "Failed to list users")
    }

    pub async fn get_user_count(&self) -> Result<u64, ApiError> {
        let response = self.send(&RequestDescriptor::get(COUNT_PATH)).await?;
        let count: UserCount = Self::decode(response, "Failed to get user count")?;
        Ok(count.count)
    }
}
