pub mod attendance_repository;
pub mod exam_repository;
pub mod material_repository;
pub mod notification_repository;
pub mod result_repository;
pub mod user_repository;

use std::sync::Arc;

use sqlx::PgPool;

pub use attendance_repository::{AttendanceRepository, PgAttendanceRepository};
pub use exam_repository::{ExamRepository, PgExamRepository};
pub use material_repository::{MaterialRepository, PgMaterialRepository};
pub use notification_repository::{NotificationRepository, PgNotificationRepository};
pub use result_repository::{PgResultRepository, ResultRepository};
pub use user_repository::{PgUserRepository, UserRepository};

/// The full persistence contract the services are built on.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub exams: Arc<dyn ExamRepository>,
    pub results: Arc<dyn ResultRepository>,
    pub attendance: Arc<dyn AttendanceRepository>,
    pub materials: Arc<dyn MaterialRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(PgUserRepository::new(pool.clone())),
            exams: Arc::new(PgExamRepository::new(pool.clone())),
            results: Arc::new(PgResultRepository::new(pool.clone())),
            attendance: Arc::new(PgAttendanceRepository::new(pool.clone())),
            materials: Arc::new(PgMaterialRepository::new(pool.clone())),
            notifications: Arc::new(PgNotificationRepository::new(pool)),
        }
    }
}
