// src/models/material.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use url::Url;
use validator::Validate;

/// Represents the 'materials' table: a file a teacher shares with a department.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Material {
    pub id: i64,
    pub teacher_id: i64,
    pub department: String,
    pub title: String,
    pub description: Option<String>,
    pub file_url: String,
    pub uploaded_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone)]
pub struct NewMaterial {
    pub teacher_id: i64,
    pub department: String,
    pub title: String,
    pub description: Option<String>,
    pub file_url: String,
}

/// DTO for sharing a material.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateMaterialRequest {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    /// Falls back to the teacher's own department.
    #[validate(length(min = 1, max = 100))]
    pub department: Option<String>,
    #[validate(length(min = 1, max = 500), custom(function = validate_url_string))]
    pub file_url: String,
}

/// Validates that a string is a correctly formatted URL.
fn validate_url_string(url: &str) -> Result<(), validator::ValidationError> {
    if Url::parse(url).is_err() {
        return Err(validator::ValidationError::new("invalid_url"));
    }
    Ok(())
}
