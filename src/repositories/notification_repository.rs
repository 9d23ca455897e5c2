use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    error::AppResult,
    models::{
        notification::{CreateNotificationRequest, Notification},
        user::Role,
    },
};

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn create_notification(&self, req: &CreateNotificationRequest)
    -> AppResult<Notification>;

    /// Notifications aimed at `role` or at both roles, newest first.
    async fn list_for_role(&self, role: Role) -> AppResult<Vec<Notification>>;
}

pub struct PgNotificationRepository {
    pool: PgPool,
}

impl PgNotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationRepository for PgNotificationRepository {
    async fn create_notification(
        &self,
        req: &CreateNotificationRequest,
    ) -> AppResult<Notification> {
        let created = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (title, description, target_user)
            VALUES ($1, $2, $3)
            RETURNING id, title, description, target_user, created_at
            "#,
        )
        .bind(&req.title)
        .bind(&req.description)
        .bind(req.target_user.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn list_for_role(&self, role: Role) -> AppResult<Vec<Notification>> {
        let notifications = sqlx::query_as::<_, Notification>(
            r#"
            SELECT id, title, description, target_user, created_at
            FROM notifications
            WHERE target_user = $1 OR target_user = 'both'
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(role.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(notifications)
    }
}
