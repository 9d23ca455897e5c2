// src/models/user.rs

use std::{fmt, str::FromStr, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Roll numbers and teacher ids: letters, digits, dash and underscore.
static LOGIN_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{3,20}$").expect("valid login id pattern"));

/// Who a principal is. Students log in with a roll number, faculty with a teacher id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Faculty,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Faculty => "faculty",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Role::Student),
            "faculty" => Ok(Role::Faculty),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,

    /// Roll number (students) or teacher id (faculty). Unique.
    pub login_id: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    /// 'student' or 'faculty'.
    pub role: String,

    pub full_name: String,
    pub department: String,

    /// Only students belong to a semester.
    pub semester: Option<i32>,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl User {
    pub fn role(&self) -> Option<Role> {
        self.role.parse().ok()
    }
}

/// Fields needed to insert a user. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub login_id: String,
    pub password_hash: String,
    pub role: Role,
    pub full_name: String,
    pub department: String,
    pub semester: Option<i32>,
}

/// DTO for creating a new account.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    pub role: Role,
    #[validate(regex(
        path = *LOGIN_ID_RE,
        message = "Login id must be 3-20 letters, digits, '-' or '_'."
    ))]
    pub login_id: String,
    #[validate(length(
        min = 4,
        max = 128,
        message = "Password length must be between 4 and 128 characters."
    ))]
    pub password: String,
    #[validate(length(min = 1, max = 150))]
    pub full_name: String,
    #[validate(length(min = 1, max = 100))]
    pub department: String,
    #[validate(range(min = 1, max = 12))]
    pub semester: Option<i32>,
}

/// DTO for user login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    pub role: Role,
    #[validate(length(min = 1, max = 20))]
    pub login_id: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}
