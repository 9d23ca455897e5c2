use std::sync::Arc;

use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        notification::{CreateNotificationRequest, Notification},
        user::Role,
    },
    repositories::NotificationRepository,
    services::authz::Principal,
    utils::html::clean_html,
};

pub struct NotificationService {
    notifications: Arc<dyn NotificationRepository>,
}

impl NotificationService {
    pub fn new(notifications: Arc<dyn NotificationRepository>) -> Self {
        Self { notifications }
    }

    pub async fn publish(
        &self,
        principal: &Principal,
        mut req: CreateNotificationRequest,
    ) -> AppResult<Notification> {
        principal.require_role(Role::Faculty)?;
        req.validate()?;
        req.description = clean_html(&req.description);
        self.notifications.create_notification(&req).await
    }

    pub async fn list_for(&self, principal: &Principal) -> AppResult<Vec<Notification>> {
        self.notifications.list_for_role(principal.role).await
    }
}
