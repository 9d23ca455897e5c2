use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use crate::{
    error::AppResult,
    models::result::{ExamAttempt, NewResult, NewSummary, StudentExamResult, StudentExamSummary},
};

/// Graded answers, per-exam summaries and attempt records of students.
#[async_trait]
pub trait ResultRepository: Send + Sync {
    /// Create-or-update keyed by (student, exam, question).
    /// Returns the stored row and whether it was newly created.
    async fn upsert_result(&self, result: NewResult) -> AppResult<(StudentExamResult, bool)>;
    async fn list_results(&self, student_id: i64, exam_id: i64) -> AppResult<Vec<StudentExamResult>>;

    /// Create-or-update keyed by (student, exam); relinks the result rows.
    async fn upsert_summary(&self, summary: NewSummary) -> AppResult<StudentExamSummary>;
    async fn find_summary(&self, student_id: i64, exam_id: i64)
    -> AppResult<Option<StudentExamSummary>>;
    async fn list_summaries_for_exam(&self, exam_id: i64) -> AppResult<Vec<StudentExamSummary>>;
    async fn attempted_exam_ids(&self, student_id: i64) -> AppResult<Vec<i64>>;

    /// Records the first start of an attempt; later calls return the original row.
    async fn start_attempt(
        &self,
        student_id: i64,
        exam_id: i64,
        now: DateTime<Utc>,
    ) -> AppResult<ExamAttempt>;
    async fn find_attempt(&self, student_id: i64, exam_id: i64) -> AppResult<Option<ExamAttempt>>;
}

pub struct PgResultRepository {
    pool: PgPool,
}

impl PgResultRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct UpsertedResult {
    #[sqlx(flatten)]
    result: StudentExamResult,
    created: bool,
}

const RESULT_COLUMNS: &str = "id, student_id, exam_id, question_id, selected_option_id, \
                              is_correct, mark_obtains, submitted_at";

const SUMMARY_SELECT: &str = r#"
    SELECT
        s.id, s.student_id, s.exam_id, s.total_marks, s.total_correct,
        s.total_questions, s.has_attempted, s.submitted_at,
        ARRAY(
            SELECT l.result_id FROM exam_summary_results l
            WHERE l.summary_id = s.id ORDER BY l.result_id
        ) AS result_ids
    FROM student_exam_summaries s
"#;

#[async_trait]
impl ResultRepository for PgResultRepository {
    async fn upsert_result(&self, new: NewResult) -> AppResult<(StudentExamResult, bool)> {
        // xmax is 0 only for rows inserted by this statement.
        let row = sqlx::query_as::<_, UpsertedResult>(&format!(
            r#"
            INSERT INTO student_exam_results
            (student_id, exam_id, question_id, selected_option_id, is_correct, mark_obtains, submitted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (student_id, exam_id, question_id) DO UPDATE SET
                selected_option_id = EXCLUDED.selected_option_id,
                is_correct = EXCLUDED.is_correct,
                mark_obtains = EXCLUDED.mark_obtains,
                submitted_at = EXCLUDED.submitted_at
            RETURNING {RESULT_COLUMNS}, (xmax = 0) AS created
            "#
        ))
        .bind(new.student_id)
        .bind(new.exam_id)
        .bind(new.answer.question_id)
        .bind(new.answer.selected_option_id)
        .bind(new.answer.is_correct)
        .bind(new.answer.mark_obtains)
        .bind(new.submitted_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to upsert exam result: {:?}", e);
            e
        })?;

        Ok((row.result, row.created))
    }

    async fn list_results(&self, student_id: i64, exam_id: i64) -> AppResult<Vec<StudentExamResult>> {
        let rows = sqlx::query_as::<_, StudentExamResult>(&format!(
            r#"
            SELECT {RESULT_COLUMNS} FROM student_exam_results
            WHERE student_id = $1 AND exam_id = $2
            ORDER BY question_id
            "#
        ))
        .bind(student_id)
        .bind(exam_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn upsert_summary(&self, summary: NewSummary) -> AppResult<StudentExamSummary> {
        let mut tx = self.pool.begin().await?;

        let summary_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO student_exam_summaries
            (student_id, exam_id, total_marks, total_correct, total_questions, has_attempted, submitted_at)
            VALUES ($1, $2, $3, $4, $5, TRUE, $6)
            ON CONFLICT (student_id, exam_id) DO UPDATE SET
                total_marks = EXCLUDED.total_marks,
                total_correct = EXCLUDED.total_correct,
                total_questions = EXCLUDED.total_questions,
                has_attempted = TRUE,
                submitted_at = EXCLUDED.submitted_at
            RETURNING id
            "#,
        )
        .bind(summary.student_id)
        .bind(summary.exam_id)
        .bind(summary.totals.total_marks)
        .bind(summary.totals.total_correct)
        .bind(summary.totals.total_questions)
        .bind(summary.submitted_at)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM exam_summary_results WHERE summary_id = $1")
            .bind(summary_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO exam_summary_results (summary_id, result_id)
            SELECT $1, UNNEST($2::BIGINT[])
            "#,
        )
        .bind(summary_id)
        .bind(&summary.result_ids)
        .execute(&mut *tx)
        .await?;

        let saved = sqlx::query_as::<_, StudentExamSummary>(&format!(
            "{SUMMARY_SELECT} WHERE s.id = $1"
        ))
        .bind(summary_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(saved)
    }

    async fn find_summary(
        &self,
        student_id: i64,
        exam_id: i64,
    ) -> AppResult<Option<StudentExamSummary>> {
        let summary = sqlx::query_as::<_, StudentExamSummary>(&format!(
            "{SUMMARY_SELECT} WHERE s.student_id = $1 AND s.exam_id = $2"
        ))
        .bind(student_id)
        .bind(exam_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(summary)
    }

    async fn list_summaries_for_exam(&self, exam_id: i64) -> AppResult<Vec<StudentExamSummary>> {
        let summaries = sqlx::query_as::<_, StudentExamSummary>(&format!(
            "{SUMMARY_SELECT} WHERE s.exam_id = $1 ORDER BY s.total_marks DESC, s.student_id"
        ))
        .bind(exam_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(summaries)
    }

    async fn attempted_exam_ids(&self, student_id: i64) -> AppResult<Vec<i64>> {
        let ids = sqlx::query_scalar(
            "SELECT exam_id FROM student_exam_summaries WHERE student_id = $1 AND has_attempted",
        )
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn start_attempt(
        &self,
        student_id: i64,
        exam_id: i64,
        now: DateTime<Utc>,
    ) -> AppResult<ExamAttempt> {
        sqlx::query(
            r#"
            INSERT INTO exam_attempts (student_id, exam_id, started_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (student_id, exam_id) DO NOTHING
            "#,
        )
        .bind(student_id)
        .bind(exam_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let attempt = sqlx::query_as::<_, ExamAttempt>(
            "SELECT student_id, exam_id, started_at FROM exam_attempts WHERE student_id = $1 AND exam_id = $2",
        )
        .bind(student_id)
        .bind(exam_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(attempt)
    }

    async fn find_attempt(&self, student_id: i64, exam_id: i64) -> AppResult<Option<ExamAttempt>> {
        let attempt = sqlx::query_as::<_, ExamAttempt>(
            "SELECT student_id, exam_id, started_at FROM exam_attempts WHERE student_id = $1 AND exam_id = $2",
        )
        .bind(student_id)
        .bind(exam_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(attempt)
    }
}
