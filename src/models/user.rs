use serde::{Deserialize, Serialize};

use super::enums::AppModule;

/// Account name that is always granted every module and cannot be edited.
pub const ADMIN_USERNAME: &str = "admin";

/// A desk user as returned to callers. The password hash never leaves the
/// repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub is_active: bool,
    pub created_at: Option<String>,
    pub permissions: Vec<AppModule>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        is_admin_username(&self.username)
    }
}

pub fn is_admin_username(username: &str) -> bool {
    username.trim().eq_ignore_ascii_case(ADMIN_USERNAME)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub full_name: String,
    pub email: String,
    pub permissions: Vec<AppModule>,
}

/// Partial update; `None` leaves the column unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub is_active: Option<bool>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.full_name.is_none()
            && self.email.is_none()
            && self.password.is_none()
            && self.is_active.is_none()
    }
}
