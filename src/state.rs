use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::{
    config::Config,
    repositories::Repositories,
    services::{
        account::AccountService, attendance::AttendanceService, authoring::ExamAuthoringService,
        grading::GradingService, material::MaterialService, notification::NotificationService,
        timetable::TimetableService,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub accounts: Arc<AccountService>,
    pub authoring: Arc<ExamAuthoringService>,
    pub grading: Arc<GradingService>,
    pub attendance: Arc<AttendanceService>,
    pub timetable: Arc<TimetableService>,
    pub materials: Arc<MaterialService>,
    pub notifications: Arc<NotificationService>,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config) -> Self {
        Self::with_repositories(Repositories::postgres(pool), config)
    }

    /// Wires every service onto the given persistence implementation.
    pub fn with_repositories(repos: Repositories, config: Config) -> Self {
        Self {
            config,
            accounts: Arc::new(AccountService::new(repos.users.clone())),
            authoring: Arc::new(ExamAuthoringService::new(repos.exams.clone())),
            grading: Arc::new(GradingService::new(repos.exams, repos.results)),
            attendance: Arc::new(AttendanceService::new(
                repos.attendance.clone(),
                repos.users,
            )),
            timetable: Arc::new(TimetableService::new(repos.attendance)),
            materials: Arc::new(MaterialService::new(repos.materials)),
            notifications: Arc::new(NotificationService::new(repos.notifications)),
        }
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
