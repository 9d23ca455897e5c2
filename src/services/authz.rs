//! Ownership checks for mutating operations.
//!
//! The check is re-derived on every call from the request's principal and the
//! stored owner; nothing about it is cached on the entity.

use serde::Serialize;

use crate::{error::AppError, models::user::Role};

/// The authenticated actor behind a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub id: i64,
    pub role: Role,
}

impl Principal {
    pub fn require_role(&self, role: Role) -> Result<(), AppError> {
        if self.role != role {
            tracing::warn!(principal = self.id, "{} required, got {}", role, self.role);
            return Err(AppError::NotAuthorized(format!(
                "Only {} accounts may do this",
                role
            )));
        }
        Ok(())
    }

    /// Fails with `NotAuthorized` unless this principal is the faculty owner.
    pub fn ensure_owner(&self, owner_id: i64, what: &str) -> Result<(), AppError> {
        self.require_role(Role::Faculty)?;
        if self.id != owner_id {
            tracing::warn!(
                principal = self.id,
                owner = owner_id,
                "Rejected mutation of {} owned by another teacher",
                what
            );
            return Err(AppError::NotAuthorized(format!(
                "You do not own this {}",
                what
            )));
        }
        Ok(())
    }
}
