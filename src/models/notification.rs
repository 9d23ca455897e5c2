// src/models/notification.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::user::Role;

/// Audience of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationTarget {
    Student,
    Faculty,
    Both,
}

impl NotificationTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationTarget::Student => "student",
            NotificationTarget::Faculty => "faculty",
            NotificationTarget::Both => "both",
        }
    }

    pub fn reaches(&self, role: Role) -> bool {
        match self {
            NotificationTarget::Both => true,
            NotificationTarget::Student => role == Role::Student,
            NotificationTarget::Faculty => role == Role::Faculty,
        }
    }
}

/// Represents the 'notifications' table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub target_user: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateNotificationRequest {
    #[validate(length(min = 1, max = 100))]
    pub title: String,
    #[validate(length(min = 1, max = 5000))]
    pub description: String,
    pub target_user: NotificationTarget,
}
