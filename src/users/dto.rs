use serde::{Deserialize, Serialize};

use crate::auth::dto::PublicUser;

use super::repo::Role;

#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    pub role: Option<Role>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    10
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

impl Pagination {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        Self {
            page,
            limit,
            total,
            pages: (total + limit - 1) / limit.max(1),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub users: Vec<PublicUser>,
    pub pagination: Pagination,
}

#[derive(Debug, Deserialize)]
pub struct AdminCreateUser {
    pub email: String,
    pub username: String,
    pub phone: Option<String>,
    pub location: Option<String>,
    #[serde(default)]
    pub role: Role,
    /// Optional. Accounts created without a password cannot log in.
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct UserMutationResponse {
    pub message: &'static str,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}
