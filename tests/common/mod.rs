// tests/common/mod.rs
//
// In-memory persistence that honors the same keys, upserts and cascades as
// the Postgres repositories, plus helpers to build an app on top of it.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::RwLock;

use campus::{
    config::Config,
    error::{AppError, AppResult},
    models::{
        attendance::{
            Attendance, AttendanceRecord, AttendanceStatus, Lecture, NewLecture,
        },
        exam::{AnswerOption, Exam, NewExam, NewOption, Question, QuestionWithOptions},
        material::{Material, NewMaterial},
        notification::{CreateNotificationRequest, Notification},
        result::{ExamAttempt, NewResult, NewSummary, StudentExamResult, StudentExamSummary},
        user::{NewUser, Role, User},
    },
    repositories::{
        AttendanceRepository, ExamRepository, MaterialRepository, NotificationRepository,
        Repositories, ResultRepository, UserRepository,
    },
    state::AppState,
};

#[derive(Default)]
struct Tables {
    next_id: i64,
    users: Vec<User>,
    exams: Vec<Exam>,
    questions: Vec<Question>,
    options: Vec<AnswerOption>,
    results: Vec<StudentExamResult>,
    summaries: Vec<StudentExamSummary>,
    attempts: Vec<ExamAttempt>,
    lectures: Vec<Lecture>,
    attendance: Vec<Attendance>,
    materials: Vec<Material>,
    notifications: Vec<Notification>,
}

impl Tables {
    fn id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn with_options(&self, question: &Question) -> QuestionWithOptions {
        QuestionWithOptions {
            question: question.clone(),
            options: self
                .options
                .iter()
                .filter(|o| o.question_id == question.id)
                .cloned()
                .collect(),
        }
    }

    fn insert_options(&mut self, question_id: i64, options: &[NewOption]) {
        for option in options {
            let id = self.id();
            self.options.push(AnswerOption {
                id,
                question_id,
                text: option.text.clone(),
                is_correct: option.is_correct,
            });
        }
    }

    /// ON DELETE SET NULL on selected_option_id.
    fn drop_options_of(&mut self, question_id: i64) {
        let removed: Vec<i64> = self
            .options
            .iter()
            .filter(|o| o.question_id == question_id)
            .map(|o| o.id)
            .collect();
        self.options.retain(|o| o.question_id != question_id);
        for row in &mut self.results {
            if row.selected_option_id.is_some_and(|id| removed.contains(&id)) {
                row.selected_option_id = None;
            }
        }
    }

    fn record(&self, row: &Attendance) -> AttendanceRecord {
        let student_name = self
            .users
            .iter()
            .find(|u| u.id == row.student_id)
            .map(|u| u.full_name.clone())
            .unwrap_or_default();
        let subject_name = self
            .lectures
            .iter()
            .find(|l| l.id == row.lecture_id)
            .map(|l| l.subject_name.clone())
            .unwrap_or_default();
        AttendanceRecord {
            id: row.id,
            student_id: row.student_id,
            student_name,
            lecture_id: row.lecture_id,
            subject_name,
            date: row.date,
            status: row.status.clone(),
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    db: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn repositories(self: &Arc<Self>) -> Repositories {
        Repositories {
            users: self.clone(),
            exams: self.clone(),
            results: self.clone(),
            attendance: self.clone(),
            materials: self.clone(),
            notifications: self.clone(),
        }
    }

    /// Raw result rows of one (student, exam) pair.
    pub async fn result_rows(&self, student_id: i64, exam_id: i64) -> Vec<StudentExamResult> {
        let db = self.db.read().await;
        db.results
            .iter()
            .filter(|r| r.student_id == student_id && r.exam_id == exam_id)
            .cloned()
            .collect()
    }

    pub async fn summary_count(&self, student_id: i64, exam_id: i64) -> usize {
        let db = self.db.read().await;
        db.summaries
            .iter()
            .filter(|s| s.student_id == student_id && s.exam_id == exam_id)
            .count()
    }

    pub async fn attendance_rows(&self) -> Vec<Attendance> {
        self.db.read().await.attendance.clone()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(&self, user: NewUser) -> AppResult<User> {
        let mut db = self.db.write().await;
        if db.users.iter().any(|u| u.login_id == user.login_id) {
            return Err(AppError::Conflict("Login id already exists".to_string()));
        }
        let row = User {
            id: db.id(),
            login_id: user.login_id,
            password: user.password_hash,
            role: user.role.as_str().to_string(),
            full_name: user.full_name,
            department: user.department,
            semester: user.semester,
            created_at: Utc::now(),
        };
        db.users.push(row.clone());
        Ok(row)
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<User>> {
        let db = self.db.read().await;
        Ok(db.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_login(&self, role: Role, login_id: &str) -> AppResult<Option<User>> {
        let db = self.db.read().await;
        Ok(db
            .users
            .iter()
            .find(|u| u.login_id == login_id && u.role == role.as_str())
            .cloned())
    }
}

#[async_trait]
impl ExamRepository for MemoryStore {
    async fn create_exam(&self, exam: NewExam) -> AppResult<Exam> {
        let mut db = self.db.write().await;
        let row = Exam {
            id: db.id(),
            title: exam.title,
            description: exam.description,
            teacher_id: exam.teacher_id,
            department: exam.department,
            semester: exam.semester,
            start_time: exam.start_time,
            end_time: exam.end_time,
            duration_minutes: exam.duration_minutes,
            created_at: Utc::now(),
        };
        db.exams.push(row.clone());
        Ok(row)
    }

    async fn find_exam(&self, id: i64) -> AppResult<Option<Exam>> {
        let db = self.db.read().await;
        Ok(db.exams.iter().find(|e| e.id == id).cloned())
    }

    async fn list_exams_by_teacher(&self, teacher_id: i64) -> AppResult<Vec<Exam>> {
        let db = self.db.read().await;
        let mut items: Vec<Exam> = db
            .exams
            .iter()
            .filter(|e| e.teacher_id == teacher_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(items)
    }

    async fn list_exams_for_class(&self, department: &str, semester: i32) -> AppResult<Vec<Exam>> {
        let db = self.db.read().await;
        let mut items: Vec<Exam> = db
            .exams
            .iter()
            .filter(|e| e.department == department && e.semester == semester)
            .cloned()
            .collect();
        items.sort_by_key(|e| e.start_time);
        Ok(items)
    }

    async fn update_exam(&self, exam: &Exam) -> AppResult<Exam> {
        let mut db = self.db.write().await;
        let row = db
            .exams
            .iter_mut()
            .find(|e| e.id == exam.id)
            .ok_or(AppError::NotFound("Exam not found".to_string()))?;
        *row = exam.clone();
        Ok(row.clone())
    }

    async fn delete_exam(&self, id: i64) -> AppResult<bool> {
        let mut db = self.db.write().await;
        let before = db.exams.len();
        db.exams.retain(|e| e.id != id);
        if db.exams.len() == before {
            return Ok(false);
        }
        let question_ids: Vec<i64> = db
            .questions
            .iter()
            .filter(|q| q.exam_id == id)
            .map(|q| q.id)
            .collect();
        db.questions.retain(|q| q.exam_id != id);
        db.options.retain(|o| !question_ids.contains(&o.question_id));
        db.results.retain(|r| r.exam_id != id);
        db.summaries.retain(|s| s.exam_id != id);
        db.attempts.retain(|a| a.exam_id != id);
        Ok(true)
    }

    async fn create_question(
        &self,
        exam_id: i64,
        text: &str,
        marks: i32,
        options: &[NewOption],
    ) -> AppResult<QuestionWithOptions> {
        let mut db = self.db.write().await;
        if !db.exams.iter().any(|e| e.id == exam_id) {
            return Err(AppError::NotFound("Exam not found".to_string()));
        }
        let question = Question {
            id: db.id(),
            exam_id,
            text: text.to_string(),
            marks,
        };
        db.questions.push(question.clone());
        db.insert_options(question.id, options);
        Ok(db.with_options(&question))
    }

    async fn find_question(&self, id: i64) -> AppResult<Option<Question>> {
        let db = self.db.read().await;
        Ok(db.questions.iter().find(|q| q.id == id).cloned())
    }

    async fn list_questions(&self, exam_id: i64) -> AppResult<Vec<QuestionWithOptions>> {
        let db = self.db.read().await;
        Ok(db
            .questions
            .iter()
            .filter(|q| q.exam_id == exam_id)
            .map(|q| db.with_options(q))
            .collect())
    }

    async fn update_question(
        &self,
        question: &Question,
        options: Option<&[NewOption]>,
    ) -> AppResult<QuestionWithOptions> {
        let mut db = self.db.write().await;
        let row = db
            .questions
            .iter_mut()
            .find(|q| q.id == question.id)
            .ok_or(AppError::NotFound("Question not found".to_string()))?;
        row.text = question.text.clone();
        row.marks = question.marks;
        let saved = row.clone();

        if let Some(options) = options {
            db.drop_options_of(saved.id);
            db.insert_options(saved.id, options);
        }
        Ok(db.with_options(&saved))
    }

    async fn delete_question(&self, id: i64) -> AppResult<bool> {
        let mut db = self.db.write().await;
        let before = db.questions.len();
        db.questions.retain(|q| q.id != id);
        if db.questions.len() == before {
            return Ok(false);
        }
        db.drop_options_of(id);
        db.results.retain(|r| r.question_id != id);
        Ok(true)
    }
}

#[async_trait]
impl ResultRepository for MemoryStore {
    async fn upsert_result(&self, new: NewResult) -> AppResult<(StudentExamResult, bool)> {
        let mut db = self.db.write().await;
        let answer = new.answer;
        if let Some(row) = db.results.iter_mut().find(|r| {
            r.student_id == new.student_id
                && r.exam_id == new.exam_id
                && r.question_id == answer.question_id
        }) {
            row.selected_option_id = answer.selected_option_id;
            row.is_correct = answer.is_correct;
            row.mark_obtains = answer.mark_obtains;
            row.submitted_at = new.submitted_at;
            return Ok((row.clone(), false));
        }

        let row = StudentExamResult {
            id: db.id(),
            student_id: new.student_id,
            exam_id: new.exam_id,
            question_id: answer.question_id,
            selected_option_id: answer.selected_option_id,
            is_correct: answer.is_correct,
            mark_obtains: answer.mark_obtains,
            submitted_at: new.submitted_at,
        };
        db.results.push(row.clone());
        Ok((row, true))
    }

    async fn list_results(&self, student_id: i64, exam_id: i64) -> AppResult<Vec<StudentExamResult>> {
        let db = self.db.read().await;
        let mut rows: Vec<StudentExamResult> = db
            .results
            .iter()
            .filter(|r| r.student_id == student_id && r.exam_id == exam_id)
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.question_id);
        Ok(rows)
    }

    async fn upsert_summary(&self, summary: NewSummary) -> AppResult<StudentExamSummary> {
        let mut db = self.db.write().await;
        let mut result_ids = summary.result_ids;
        result_ids.sort_unstable();

        if let Some(row) = db
            .summaries
            .iter_mut()
            .find(|s| s.student_id == summary.student_id && s.exam_id == summary.exam_id)
        {
            row.total_marks = summary.totals.total_marks;
            row.total_correct = summary.totals.total_correct;
            row.total_questions = summary.totals.total_questions;
            row.has_attempted = true;
            row.submitted_at = summary.submitted_at;
            row.result_ids = result_ids;
            return Ok(row.clone());
        }

        let row = StudentExamSummary {
            id: db.id(),
            student_id: summary.student_id,
            exam_id: summary.exam_id,
            total_marks: summary.totals.total_marks,
            total_correct: summary.totals.total_correct,
            total_questions: summary.totals.total_questions,
            has_attempted: true,
            submitted_at: summary.submitted_at,
            result_ids,
        };
        db.summaries.push(row.clone());
        Ok(row)
    }

    async fn find_summary(
        &self,
        student_id: i64,
        exam_id: i64,
    ) -> AppResult<Option<StudentExamSummary>> {
        let db = self.db.read().await;
        Ok(db
            .summaries
            .iter()
            .find(|s| s.student_id == student_id && s.exam_id == exam_id)
            .cloned())
    }

    async fn list_summaries_for_exam(&self, exam_id: i64) -> AppResult<Vec<StudentExamSummary>> {
        let db = self.db.read().await;
        let mut rows: Vec<StudentExamSummary> = db
            .summaries
            .iter()
            .filter(|s| s.exam_id == exam_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.total_marks
                .cmp(&a.total_marks)
                .then(a.student_id.cmp(&b.student_id))
        });
        Ok(rows)
    }

    async fn attempted_exam_ids(&self, student_id: i64) -> AppResult<Vec<i64>> {
        let db = self.db.read().await;
        Ok(db
            .summaries
            .iter()
            .filter(|s| s.student_id == student_id && s.has_attempted)
            .map(|s| s.exam_id)
            .collect())
    }

    async fn start_attempt(
        &self,
        student_id: i64,
        exam_id: i64,
        now: DateTime<Utc>,
    ) -> AppResult<ExamAttempt> {
        let mut db = self.db.write().await;
        if let Some(existing) = db
            .attempts
            .iter()
            .find(|a| a.student_id == student_id && a.exam_id == exam_id)
        {
            return Ok(existing.clone());
        }
        let attempt = ExamAttempt {
            student_id,
            exam_id,
            started_at: now,
        };
        db.attempts.push(attempt.clone());
        Ok(attempt)
    }

    async fn find_attempt(&self, student_id: i64, exam_id: i64) -> AppResult<Option<ExamAttempt>> {
        let db = self.db.read().await;
        Ok(db
            .attempts
            .iter()
            .find(|a| a.student_id == student_id && a.exam_id == exam_id)
            .cloned())
    }
}

#[async_trait]
impl AttendanceRepository for MemoryStore {
    async fn create_lecture(&self, lecture: NewLecture) -> AppResult<Lecture> {
        let mut db = self.db.write().await;
        let row = Lecture {
            id: db.id(),
            department: lecture.department,
            teacher_id: lecture.teacher_id,
            semester: lecture.semester,
            subject_name: lecture.subject_name,
            day: lecture.day.as_str().to_string(),
            date: lecture.date,
            start_time: lecture.start_time,
            end_time: lecture.end_time,
        };
        db.lectures.push(row.clone());
        Ok(row)
    }

    async fn find_lecture(&self, id: i64) -> AppResult<Option<Lecture>> {
        let db = self.db.read().await;
        Ok(db.lectures.iter().find(|l| l.id == id).cloned())
    }

    async fn list_lectures_for_class(
        &self,
        department: &str,
        semester: i32,
    ) -> AppResult<Vec<Lecture>> {
        let db = self.db.read().await;
        let mut items: Vec<Lecture> = db
            .lectures
            .iter()
            .filter(|l| l.department == department && l.semester == semester)
            .cloned()
            .collect();
        items.sort_by_key(|l| l.start_time);
        Ok(items)
    }

    async fn list_lectures_by_teacher(&self, teacher_id: i64) -> AppResult<Vec<Lecture>> {
        let db = self.db.read().await;
        let mut items: Vec<Lecture> = db
            .lectures
            .iter()
            .filter(|l| l.teacher_id == teacher_id)
            .cloned()
            .collect();
        items.sort_by_key(|l| l.start_time);
        Ok(items)
    }

    async fn upsert_attendance(
        &self,
        student_id: i64,
        lecture_id: i64,
        date: NaiveDate,
        status: AttendanceStatus,
    ) -> AppResult<(Attendance, bool)> {
        let mut db = self.db.write().await;
        if !db.users.iter().any(|u| u.id == student_id) {
            return Err(AppError::InvalidInput(format!(
                "Unknown student {}",
                student_id
            )));
        }
        if let Some(row) = db.attendance.iter_mut().find(|a| {
            a.student_id == student_id && a.lecture_id == lecture_id && a.date == date
        }) {
            row.status = status.as_str().to_string();
            return Ok((row.clone(), false));
        }

        let row = Attendance {
            id: db.id(),
            student_id,
            lecture_id,
            date,
            status: status.as_str().to_string(),
        };
        db.attendance.push(row.clone());
        Ok((row, true))
    }

    async fn list_student_attendance(&self, student_id: i64) -> AppResult<Vec<AttendanceRecord>> {
        let db = self.db.read().await;
        let mut rows: Vec<AttendanceRecord> = db
            .attendance
            .iter()
            .filter(|a| a.student_id == student_id)
            .map(|a| db.record(a))
            .collect();
        rows.sort_by_key(|r| (r.date, r.id));
        Ok(rows)
    }

    async fn list_lecture_attendance(&self, lecture_id: i64) -> AppResult<Vec<AttendanceRecord>> {
        let db = self.db.read().await;
        let mut rows: Vec<AttendanceRecord> = db
            .attendance
            .iter()
            .filter(|a| a.lecture_id == lecture_id)
            .map(|a| db.record(a))
            .collect();
        rows.sort_by(|a, b| a.date.cmp(&b.date).then(a.student_name.cmp(&b.student_name)));
        Ok(rows)
    }
}

#[async_trait]
impl MaterialRepository for MemoryStore {
    async fn create_material(&self, material: NewMaterial) -> AppResult<Material> {
        let mut db = self.db.write().await;
        let row = Material {
            id: db.id(),
            teacher_id: material.teacher_id,
            department: material.department,
            title: material.title,
            description: material.description,
            file_url: material.file_url,
            uploaded_at: Utc::now(),
        };
        db.materials.push(row.clone());
        Ok(row)
    }

    async fn find_material(&self, id: i64) -> AppResult<Option<Material>> {
        let db = self.db.read().await;
        Ok(db.materials.iter().find(|m| m.id == id).cloned())
    }

    async fn list_by_teacher(&self, teacher_id: i64) -> AppResult<Vec<Material>> {
        let db = self.db.read().await;
        Ok(db
            .materials
            .iter()
            .rev()
            .filter(|m| m.teacher_id == teacher_id)
            .cloned()
            .collect())
    }

    async fn list_by_department(&self, department: &str) -> AppResult<Vec<Material>> {
        let db = self.db.read().await;
        Ok(db
            .materials
            .iter()
            .rev()
            .filter(|m| m.department == department)
            .cloned()
            .collect())
    }

    async fn delete_material(&self, id: i64) -> AppResult<bool> {
        let mut db = self.db.write().await;
        let before = db.materials.len();
        db.materials.retain(|m| m.id != id);
        Ok(db.materials.len() != before)
    }
}

#[async_trait]
impl NotificationRepository for MemoryStore {
    async fn create_notification(
        &self,
        req: &CreateNotificationRequest,
    ) -> AppResult<Notification> {
        let mut db = self.db.write().await;
        let row = Notification {
            id: db.id(),
            title: req.title.clone(),
            description: req.description.clone(),
            target_user: req.target_user.as_str().to_string(),
            created_at: Utc::now(),
        };
        db.notifications.push(row.clone());
        Ok(row)
    }

    async fn list_for_role(&self, role: Role) -> AppResult<Vec<Notification>> {
        let db = self.db.read().await;
        Ok(db
            .notifications
            .iter()
            .rev()
            .filter(|n| n.target_user == "both" || n.target_user == role.as_str())
            .cloned()
            .collect())
    }
}

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://unused".to_string(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        server_port: 0,
    }
}

pub fn test_state(store: &Arc<MemoryStore>) -> AppState {
    AppState::with_repositories(store.repositories(), test_config())
}

/// Spawns the app on a random port and returns its base URL.
pub async fn spawn_app(store: &Arc<MemoryStore>) -> String {
    let app = campus::create_router(test_state(store));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://127.0.0.1:{}", port)
}
