use std::{collections::BTreeMap, sync::Arc};

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        attendance::{CreateLectureRequest, Day, DaySchedule, Lecture, NewLecture},
        user::{Role, User},
    },
    repositories::AttendanceRepository,
    services::authz::Principal,
};

/// Groups lectures by weekday in week order, each day sorted by start time.
/// Days without lectures are left out.
pub fn group_by_day(lectures: Vec<Lecture>) -> Vec<DaySchedule> {
    let mut days: BTreeMap<Day, Vec<Lecture>> = BTreeMap::new();
    for lecture in lectures {
        match lecture.day.parse::<Day>() {
            Ok(day) => days.entry(day).or_default().push(lecture),
            Err(e) => tracing::warn!(lecture = lecture.id, "Skipping lecture: {}", e),
        }
    }

    days.into_iter()
        .map(|(day, mut lectures)| {
            lectures.sort_by_key(|l| l.start_time);
            DaySchedule { day, lectures }
        })
        .collect()
}

pub struct TimetableService {
    repo: Arc<dyn AttendanceRepository>,
}

impl TimetableService {
    pub fn new(repo: Arc<dyn AttendanceRepository>) -> Self {
        Self { repo }
    }

    pub async fn create_lecture(
        &self,
        principal: &Principal,
        req: CreateLectureRequest,
    ) -> AppResult<Lecture> {
        principal.require_role(Role::Faculty)?;
        req.validate()?;
        if req.start_time >= req.end_time {
            return Err(AppError::InvalidInput(
                "Lecture start time must be before its end time".to_string(),
            ));
        }

        self.repo
            .create_lecture(NewLecture {
                department: req.department,
                teacher_id: principal.id,
                semester: req.semester,
                subject_name: req.subject_name,
                day: req.day,
                date: req.date,
                start_time: req.start_time,
                end_time: req.end_time,
            })
            .await
    }

    /// The weekly timetable of a student's class.
    pub async fn timetable_for_student(&self, student: &User) -> AppResult<Vec<DaySchedule>> {
        let Some(semester) = student.semester else {
            return Ok(Vec::new());
        };
        let lectures = self
            .repo
            .list_lectures_for_class(&student.department, semester)
            .await?;
        Ok(group_by_day(lectures))
    }

    pub async fn my_lectures(&self, principal: &Principal) -> AppResult<Vec<DaySchedule>> {
        principal.require_role(Role::Faculty)?;
        let lectures = self.repo.list_lectures_by_teacher(principal.id).await?;
        Ok(group_by_day(lectures))
    }
}
