use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::model::user::User;

#[derive(Deserialize, ToSchema)]
pub struct RegisterReq {
    pub name: String,
    pub email: String,
    pub password: String,
    /// Defaults to employee when absent.
    pub role: Option<String>,
    /// Registration key, checked for admin sign-ups when the server has
    /// one configured.
    pub key: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginReq {
    /// Email address or human-readable id (EMP-1000 style).
    #[serde(rename = "emailOrId")]
    pub email_or_id: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct UserResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(rename = "employeeId")]
    pub employee_code: String,
    pub role: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            employee_code: user.employee_code,
            role: user.role,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
    pub user: UserResponse,
}

/// Minimal user identity joined onto admin listings and the daily
/// absentee snapshot.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct EmployeeSummary {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(rename = "employeeId")]
    pub employee_code: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i64,
    /// Email at issue time. Identity is re-resolved from storage on every
    /// request, so this is informational.
    pub sub: String,
    pub role: String,
    pub exp: usize,
    pub jti: String,
    pub token_type: TokenType,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub enum TokenType {
    Access,
    Refresh,
}
