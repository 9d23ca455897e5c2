use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use crate::{
    error::AppResult,
    models::exam::{AnswerOption, Exam, NewExam, NewOption, Question, QuestionWithOptions},
};

/// Exams, their questions and option sets.
/// Deleting an exam or question cascades to everything below it.
#[async_trait]
pub trait ExamRepository: Send + Sync {
    async fn create_exam(&self, exam: NewExam) -> AppResult<Exam>;
    async fn find_exam(&self, id: i64) -> AppResult<Option<Exam>>;
    async fn list_exams_by_teacher(&self, teacher_id: i64) -> AppResult<Vec<Exam>>;
    async fn list_exams_for_class(&self, department: &str, semester: i32) -> AppResult<Vec<Exam>>;
    async fn update_exam(&self, exam: &Exam) -> AppResult<Exam>;
    async fn delete_exam(&self, id: i64) -> AppResult<bool>;

    /// Inserts the question and its options atomically.
    async fn create_question(
        &self,
        exam_id: i64,
        text: &str,
        marks: i32,
        options: &[NewOption],
    ) -> AppResult<QuestionWithOptions>;
    async fn find_question(&self, id: i64) -> AppResult<Option<Question>>;
    async fn list_questions(&self, exam_id: i64) -> AppResult<Vec<QuestionWithOptions>>;

    /// Saves text and marks; `Some(options)` replaces the whole option set.
    async fn update_question(
        &self,
        question: &Question,
        options: Option<&[NewOption]>,
    ) -> AppResult<QuestionWithOptions>;
    async fn delete_question(&self, id: i64) -> AppResult<bool>;
}

pub struct PgExamRepository {
    pool: PgPool,
}

impl PgExamRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_options(
        tx: &mut Transaction<'_, Postgres>,
        question_id: i64,
        options: &[NewOption],
    ) -> AppResult<Vec<AnswerOption>> {
        let mut inserted = Vec::with_capacity(options.len());
        for opt in options {
            let row = sqlx::query_as::<_, AnswerOption>(
                r#"
                INSERT INTO options (question_id, text, is_correct)
                VALUES ($1, $2, $3)
                RETURNING id, question_id, text, is_correct
                "#,
            )
            .bind(question_id)
            .bind(&opt.text)
            .bind(opt.is_correct)
            .fetch_one(&mut **tx)
            .await?;
            inserted.push(row);
        }
        Ok(inserted)
    }
}

const EXAM_COLUMNS: &str = "id, title, description, teacher_id, department, semester, \
                            start_time, end_time, duration_minutes, created_at";

#[async_trait]
impl ExamRepository for PgExamRepository {
    async fn create_exam(&self, exam: NewExam) -> AppResult<Exam> {
        let created = sqlx::query_as::<_, Exam>(&format!(
            r#"
            INSERT INTO exams
            (title, description, teacher_id, department, semester, start_time, end_time, duration_minutes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {EXAM_COLUMNS}
            "#
        ))
        .bind(&exam.title)
        .bind(&exam.description)
        .bind(exam.teacher_id)
        .bind(&exam.department)
        .bind(exam.semester)
        .bind(exam.start_time)
        .bind(exam.end_time)
        .bind(exam.duration_minutes)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create exam: {:?}", e);
            e
        })?;
        Ok(created)
    }

    async fn find_exam(&self, id: i64) -> AppResult<Option<Exam>> {
        let exam = sqlx::query_as::<_, Exam>(&format!(
            "SELECT {EXAM_COLUMNS} FROM exams WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(exam)
    }

    async fn list_exams_by_teacher(&self, teacher_id: i64) -> AppResult<Vec<Exam>> {
        let exams = sqlx::query_as::<_, Exam>(&format!(
            "SELECT {EXAM_COLUMNS} FROM exams WHERE teacher_id = $1 ORDER BY start_time DESC"
        ))
        .bind(teacher_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(exams)
    }

    async fn list_exams_for_class(&self, department: &str, semester: i32) -> AppResult<Vec<Exam>> {
        let exams = sqlx::query_as::<_, Exam>(&format!(
            r#"
            SELECT {EXAM_COLUMNS} FROM exams
            WHERE department = $1 AND semester = $2
            ORDER BY start_time ASC
            "#
        ))
        .bind(department)
        .bind(semester)
        .fetch_all(&self.pool)
        .await?;
        Ok(exams)
    }

    async fn update_exam(&self, exam: &Exam) -> AppResult<Exam> {
        let updated = sqlx::query_as::<_, Exam>(&format!(
            r#"
            UPDATE exams SET
                title = $2, description = $3, semester = $4,
                start_time = $5, end_time = $6, duration_minutes = $7
            WHERE id = $1
            RETURNING {EXAM_COLUMNS}
            "#
        ))
        .bind(exam.id)
        .bind(&exam.title)
        .bind(&exam.description)
        .bind(exam.semester)
        .bind(exam.start_time)
        .bind(exam.end_time)
        .bind(exam.duration_minutes)
        .fetch_one(&self.pool)
        .await?;
        Ok(updated)
    }

    async fn delete_exam(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM exams WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_question(
        &self,
        exam_id: i64,
        text: &str,
        marks: i32,
        options: &[NewOption],
    ) -> AppResult<QuestionWithOptions> {
        let mut tx = self.pool.begin().await?;

        let question = sqlx::query_as::<_, Question>(
            r#"
            INSERT INTO questions (exam_id, text, marks)
            VALUES ($1, $2, $3)
            RETURNING id, exam_id, text, marks
            "#,
        )
        .bind(exam_id)
        .bind(text)
        .bind(marks)
        .fetch_one(&mut *tx)
        .await?;

        let options = Self::insert_options(&mut tx, question.id, options).await?;
        tx.commit().await?;

        Ok(QuestionWithOptions { question, options })
    }

    async fn find_question(&self, id: i64) -> AppResult<Option<Question>> {
        let question = sqlx::query_as::<_, Question>(
            "SELECT id, exam_id, text, marks FROM questions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(question)
    }

    async fn list_questions(&self, exam_id: i64) -> AppResult<Vec<QuestionWithOptions>> {
        let questions = sqlx::query_as::<_, Question>(
            "SELECT id, exam_id, text, marks FROM questions WHERE exam_id = $1 ORDER BY id",
        )
        .bind(exam_id)
        .fetch_all(&self.pool)
        .await?;

        let options = sqlx::query_as::<_, AnswerOption>(
            r#"
            SELECT o.id, o.question_id, o.text, o.is_correct
            FROM options o
            JOIN questions q ON o.question_id = q.id
            WHERE q.exam_id = $1
            ORDER BY o.id
            "#,
        )
        .bind(exam_id)
        .fetch_all(&self.pool)
        .await?;

        let mut by_question: HashMap<i64, Vec<AnswerOption>> = HashMap::new();
        for opt in options {
            by_question.entry(opt.question_id).or_default().push(opt);
        }

        Ok(questions
            .into_iter()
            .map(|question| {
                let options = by_question.remove(&question.id).unwrap_or_default();
                QuestionWithOptions { question, options }
            })
            .collect())
    }

    async fn update_question(
        &self,
        question: &Question,
        options: Option<&[NewOption]>,
    ) -> AppResult<QuestionWithOptions> {
        let mut tx = self.pool.begin().await?;

        let saved = sqlx::query_as::<_, Question>(
            r#"
            UPDATE questions SET text = $2, marks = $3
            WHERE id = $1
            RETURNING id, exam_id, text, marks
            "#,
        )
        .bind(question.id)
        .bind(&question.text)
        .bind(question.marks)
        .fetch_one(&mut *tx)
        .await?;

        let options = match options {
            Some(new_options) => {
                sqlx::query("DELETE FROM options WHERE question_id = $1")
                    .bind(saved.id)
                    .execute(&mut *tx)
                    .await?;
                Self::insert_options(&mut tx, saved.id, new_options).await?
            }
            None => {
                sqlx::query_as::<_, AnswerOption>(
                    "SELECT id, question_id, text, is_correct FROM options WHERE question_id = $1 ORDER BY id",
                )
                .bind(saved.id)
                .fetch_all(&mut *tx)
                .await?
            }
        };

        tx.commit().await?;
        Ok(QuestionWithOptions {
            question: saved,
            options,
        })
    }

    async fn delete_question(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM questions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
