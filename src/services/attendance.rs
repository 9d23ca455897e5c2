//! Attendance recording and aggregation.

use std::{collections::BTreeMap, sync::Arc};

use chrono::NaiveDate;
use validator::Validate;

use crate::{
    config::PERCENTAGE_DECIMALS,
    error::{AppError, AppResult},
    models::{
        attendance::{
            Attendance, AttendanceByDate, AttendanceRecord, AttendanceStatus, AttendanceSummary,
            Lecture, TakeAttendanceRequest, TakeAttendanceResponse,
        },
        user::Role,
    },
    repositories::{AttendanceRepository, UserRepository},
    services::authz::Principal,
};

/// `present / total * 100`, rounded to two decimals; 0 when `total` is 0.
pub fn percentage(present: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let factor = 10f64.powi(PERCENTAGE_DECIMALS);
    (present as f64 / total as f64 * 100.0 * factor).round() / factor
}

fn summarize_group<'a>(
    key: String,
    records: impl Iterator<Item = &'a AttendanceRecord>,
) -> AttendanceSummary {
    let (present, total) = records.fold((0, 0), |(present, total), r| {
        (present + usize::from(r.is_present()), total + 1)
    });
    AttendanceSummary {
        key,
        present,
        total,
        percentage: percentage(present, total),
    }
}

/// One summary per subject, ordered by subject name.
/// Subjects only appear when they have at least one record.
pub fn percentage_by_subject(records: &[AttendanceRecord]) -> Vec<AttendanceSummary> {
    let mut by_subject: BTreeMap<&str, Vec<&AttendanceRecord>> = BTreeMap::new();
    for r in records {
        by_subject.entry(r.subject_name.as_str()).or_default().push(r);
    }
    by_subject
        .into_iter()
        .map(|(subject, rows)| summarize_group(subject.to_string(), rows.into_iter()))
        .collect()
}

/// Partitions records by date and selects one date for display.
///
/// Without an explicit choice the earliest recorded date is selected.
pub fn by_date(records: &[AttendanceRecord], selected: Option<NaiveDate>) -> AttendanceByDate {
    let mut partitions: BTreeMap<NaiveDate, Vec<&AttendanceRecord>> = BTreeMap::new();
    for r in records {
        partitions.entry(r.date).or_default().push(r);
    }

    let selected_date = selected.or_else(|| partitions.keys().next().copied());
    let selected_records = selected_date
        .and_then(|d| partitions.get(&d))
        .map(|rows| rows.iter().map(|r| (*r).clone()).collect())
        .unwrap_or_default();

    let dates = partitions
        .iter()
        .map(|(date, rows)| summarize_group(date.to_string(), rows.iter().copied()))
        .collect();

    AttendanceByDate {
        dates,
        selected_date,
        records: selected_records,
    }
}

pub struct AttendanceService {
    repo: Arc<dyn AttendanceRepository>,
    users: Arc<dyn UserRepository>,
}

impl AttendanceService {
    pub fn new(repo: Arc<dyn AttendanceRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self { repo, users }
    }

    async fn load_lecture(&self, lecture_id: i64) -> AppResult<Lecture> {
        self.repo
            .find_lecture(lecture_id)
            .await?
            .ok_or(AppError::NotFound("Lecture not found".to_string()))
    }

    async fn owned_lecture(&self, lecture_id: i64, principal: &Principal) -> AppResult<Lecture> {
        let lecture = self.load_lecture(lecture_id).await?;
        principal.ensure_owner(lecture.teacher_id, "lecture")?;
        Ok(lecture)
    }

    /// Every id must be a student of the lecture's department and semester.
    async fn ensure_class_members(&self, lecture: &Lecture, student_ids: &[i64]) -> AppResult<()> {
        for &id in student_ids {
            let member = self.users.find_by_id(id).await?.is_some_and(|u| {
                u.role() == Some(Role::Student)
                    && u.department == lecture.department
                    && u.semester == Some(lecture.semester)
            });
            if !member {
                tracing::warn!(lecture = lecture.id, student = id, "Attendance for non-member refused");
                return Err(AppError::InvalidInput(format!(
                    "User {} is not a student of this lecture's class",
                    id
                )));
            }
        }
        Ok(())
    }

    /// Create-or-overwrite keyed by (student, lecture, date).
    pub async fn record_attendance(
        &self,
        student_id: i64,
        lecture_id: i64,
        date: NaiveDate,
        status: AttendanceStatus,
    ) -> AppResult<(Attendance, bool)> {
        let lecture = self.load_lecture(lecture_id).await?;
        self.ensure_class_members(&lecture, &[student_id]).await?;
        self.repo
            .upsert_attendance(student_id, lecture.id, date, status)
            .await
    }

    /// Records a whole class for one lecture on one date.
    ///
    /// Every entry is checked before the first write, so a refused request
    /// stores nothing.
    pub async fn take_attendance(
        &self,
        lecture_id: i64,
        principal: &Principal,
        req: TakeAttendanceRequest,
        today: NaiveDate,
    ) -> AppResult<TakeAttendanceResponse> {
        req.validate()?;
        let lecture = self.owned_lecture(lecture_id, principal).await?;
        let date = req.date.unwrap_or(today);

        let student_ids: Vec<i64> = req.entries.iter().map(|e| e.student_id).collect();
        self.ensure_class_members(&lecture, &student_ids).await?;

        let mut created = 0;
        let mut updated = 0;
        for entry in &req.entries {
            let (_, was_created) = self
                .repo
                .upsert_attendance(entry.student_id, lecture.id, date, entry.status)
                .await?;
            if was_created {
                created += 1;
            } else {
                updated += 1;
            }
        }

        tracing::info!(
            lecture = lecture.id,
            %date,
            created,
            updated,
            "Attendance recorded"
        );

        Ok(TakeAttendanceResponse {
            lecture_id: lecture.id,
            date,
            created,
            updated,
        })
    }

    pub async fn student_percentages(&self, student_id: i64) -> AppResult<Vec<AttendanceSummary>> {
        let records = self.repo.list_student_attendance(student_id).await?;
        Ok(percentage_by_subject(&records))
    }

    pub async fn student_by_date(
        &self,
        student_id: i64,
        selected: Option<NaiveDate>,
    ) -> AppResult<AttendanceByDate> {
        let records = self.repo.list_student_attendance(student_id).await?;
        Ok(by_date(&records, selected))
    }

    pub async fn lecture_by_date(
        &self,
        lecture_id: i64,
        principal: &Principal,
        selected: Option<NaiveDate>,
    ) -> AppResult<AttendanceByDate> {
        let lecture = self.owned_lecture(lecture_id, principal).await?;
        let records = self.repo.list_lecture_attendance(lecture.id).await?;
        Ok(by_date(&records, selected))
    }
}
