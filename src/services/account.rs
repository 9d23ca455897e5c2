use std::sync::Arc;

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::user::{LoginRequest, NewUser, RegisterRequest, Role, User},
    repositories::UserRepository,
    utils::hash::{hash_password, verify_password},
};

pub struct AccountService {
    users: Arc<dyn UserRepository>,
}

impl AccountService {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    /// Creates a student (identified by roll number) or faculty (teacher id) account.
    pub async fn register(&self, req: RegisterRequest) -> AppResult<User> {
        req.validate()?;

        let semester = match (req.role, req.semester) {
            (Role::Student, None) => {
                return Err(AppError::InvalidInput(
                    "Students must belong to a semester".to_string(),
                ));
            }
            (Role::Student, semester) => semester,
            (Role::Faculty, _) => None,
        };

        let user = self
            .users
            .create_user(NewUser {
                login_id: req.login_id,
                password_hash: hash_password(&req.password)?,
                role: req.role,
                full_name: req.full_name,
                department: req.department,
                semester,
            })
            .await?;

        tracing::info!(user = user.id, role = %req.role, "Account registered");
        Ok(user)
    }

    /// Returns the account if the password matches.
    pub async fn authenticate(&self, req: &LoginRequest) -> AppResult<User> {
        req.validate()?;

        let user = self
            .users
            .find_by_login(req.role, &req.login_id)
            .await?
            .ok_or(AppError::AuthError("User not found".to_string()))?;

        if !verify_password(&req.password, &user.password)? {
            tracing::warn!(user = user.id, "Failed login attempt");
            return Err(AppError::AuthError("Invalid password".to_string()));
        }

        Ok(user)
    }

    pub async fn profile(&self, id: i64) -> AppResult<User> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or(AppError::NotFound("User not found".to_string()))
    }
}
