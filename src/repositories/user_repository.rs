use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    error::{AppError, AppResult},
    models::user::{NewUser, Role, User},
};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create_user(&self, user: NewUser) -> AppResult<User>;
    async fn find_by_id(&self, id: i64) -> AppResult<Option<User>>;
    async fn find_by_login(&self, role: Role, login_id: &str) -> AppResult<Option<User>>;
}

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str =
    "id, login_id, password, role, full_name, department, semester, created_at";

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create_user(&self, user: NewUser) -> AppResult<User> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (login_id, password, role, full_name, department, semester)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.login_id)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(&user.full_name)
        .bind(&user.department)
        .bind(user.semester)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict(format!("Login id '{}' already exists", user.login_id))
            }
            _ => {
                tracing::error!("Failed to create user: {:?}", e);
                AppError::from(e)
            }
        })
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_by_login(&self, role: Role, login_id: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE login_id = $1 AND role = $2"
        ))
        .bind(login_id)
        .bind(role.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }
}
