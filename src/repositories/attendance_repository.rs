use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{FromRow, PgPool};

use crate::{
    error::{AppError, AppResult},
    models::attendance::{Attendance, AttendanceRecord, AttendanceStatus, Lecture, NewLecture},
};

/// Timetable lectures and the attendance taken for them.
#[async_trait]
pub trait AttendanceRepository: Send + Sync {
    async fn create_lecture(&self, lecture: NewLecture) -> AppResult<Lecture>;
    async fn find_lecture(&self, id: i64) -> AppResult<Option<Lecture>>;
    async fn list_lectures_for_class(&self, department: &str, semester: i32)
    -> AppResult<Vec<Lecture>>;
    async fn list_lectures_by_teacher(&self, teacher_id: i64) -> AppResult<Vec<Lecture>>;

    /// Create-or-update keyed by (student, lecture, date).
    /// Returns the stored row and whether it was newly created.
    async fn upsert_attendance(
        &self,
        student_id: i64,
        lecture_id: i64,
        date: NaiveDate,
        status: AttendanceStatus,
    ) -> AppResult<(Attendance, bool)>;
    async fn list_student_attendance(&self, student_id: i64) -> AppResult<Vec<AttendanceRecord>>;
    async fn list_lecture_attendance(&self, lecture_id: i64) -> AppResult<Vec<AttendanceRecord>>;
}

pub struct PgAttendanceRepository {
    pool: PgPool,
}

impl PgAttendanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct UpsertedAttendance {
    #[sqlx(flatten)]
    attendance: Attendance,
    created: bool,
}

const LECTURE_COLUMNS: &str =
    "id, department, teacher_id, semester, subject_name, day, date, start_time, end_time";

const RECORD_SELECT: &str = r#"
    SELECT
        a.id, a.student_id, u.full_name AS student_name,
        a.lecture_id, l.subject_name, a.date, a.status
    FROM attendance a
    JOIN lectures l ON a.lecture_id = l.id
    JOIN users u ON a.student_id = u.id
"#;

#[async_trait]
impl AttendanceRepository for PgAttendanceRepository {
    async fn create_lecture(&self, lecture: NewLecture) -> AppResult<Lecture> {
        let created = sqlx::query_as::<_, Lecture>(&format!(
            r#"
            INSERT INTO lectures
            (department, teacher_id, semester, subject_name, day, date, start_time, end_time)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {LECTURE_COLUMNS}
            "#
        ))
        .bind(&lecture.department)
        .bind(lecture.teacher_id)
        .bind(lecture.semester)
        .bind(&lecture.subject_name)
        .bind(lecture.day.as_str())
        .bind(lecture.date)
        .bind(lecture.start_time)
        .bind(lecture.end_time)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn find_lecture(&self, id: i64) -> AppResult<Option<Lecture>> {
        let lecture = sqlx::query_as::<_, Lecture>(&format!(
            "SELECT {LECTURE_COLUMNS} FROM lectures WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(lecture)
    }

    async fn list_lectures_for_class(
        &self,
        department: &str,
        semester: i32,
    ) -> AppResult<Vec<Lecture>> {
        let lectures = sqlx::query_as::<_, Lecture>(&format!(
            "SELECT {LECTURE_COLUMNS} FROM lectures WHERE department = $1 AND semester = $2 ORDER BY start_time"
        ))
        .bind(department)
        .bind(semester)
        .fetch_all(&self.pool)
        .await?;
        Ok(lectures)
    }

    async fn list_lectures_by_teacher(&self, teacher_id: i64) -> AppResult<Vec<Lecture>> {
        let lectures = sqlx::query_as::<_, Lecture>(&format!(
            "SELECT {LECTURE_COLUMNS} FROM lectures WHERE teacher_id = $1 ORDER BY start_time"
        ))
        .bind(teacher_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(lectures)
    }

    async fn upsert_attendance(
        &self,
        student_id: i64,
        lecture_id: i64,
        date: NaiveDate,
        status: AttendanceStatus,
    ) -> AppResult<(Attendance, bool)> {
        let row = sqlx::query_as::<_, UpsertedAttendance>(
            r#"
            INSERT INTO attendance (student_id, lecture_id, date, status)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (student_id, lecture_id, date) DO UPDATE SET
                status = EXCLUDED.status
            RETURNING id, student_id, lecture_id, date, status, (xmax = 0) AS created
            "#,
        )
        .bind(student_id)
        .bind(lecture_id)
        .bind(date)
        .bind(status.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                AppError::InvalidInput(format!("Unknown student {}", student_id))
            }
            _ => {
                tracing::error!("Failed to upsert attendance: {:?}", e);
                AppError::from(e)
            }
        })?;
        Ok((row.attendance, row.created))
    }

    async fn list_student_attendance(&self, student_id: i64) -> AppResult<Vec<AttendanceRecord>> {
        let records = sqlx::query_as::<_, AttendanceRecord>(&format!(
            "{RECORD_SELECT} WHERE a.student_id = $1 ORDER BY a.date, l.start_time"
        ))
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    async fn list_lecture_attendance(&self, lecture_id: i64) -> AppResult<Vec<AttendanceRecord>> {
        let records = sqlx::query_as::<_, AttendanceRecord>(&format!(
            "{RECORD_SELECT} WHERE a.lecture_id = $1 ORDER BY a.date, u.full_name"
        ))
        .bind(lecture_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }
}
