// src/models/result.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::exam::{Exam, PublicQuestion};

/// Represents the 'student_exam_results' table.
/// One row per (student, exam, question); resubmission overwrites it.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct StudentExamResult {
    pub id: i64,
    pub student_id: i64,
    pub exam_id: i64,
    pub question_id: i64,

    /// `None` means the question was not answered.
    pub selected_option_id: Option<i64>,

    pub is_correct: bool,
    pub mark_obtains: i32,
    pub submitted_at: DateTime<Utc>,
}

/// Outcome of grading a single question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradedAnswer {
    pub question_id: i64,
    pub selected_option_id: Option<i64>,
    pub is_correct: bool,
    pub mark_obtains: i32,
}

/// A graded answer bound to its (student, exam) key, ready to upsert.
#[derive(Debug, Clone)]
pub struct NewResult {
    pub student_id: i64,
    pub exam_id: i64,
    pub answer: GradedAnswer,
    pub submitted_at: DateTime<Utc>,
}

/// Totals derived from the full current set of result rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SummaryTotals {
    pub total_marks: i32,
    pub total_correct: i32,
    pub total_questions: i32,
}

/// Represents the 'student_exam_summaries' table plus its linked result ids.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct StudentExamSummary {
    pub id: i64,
    pub student_id: i64,
    pub exam_id: i64,
    pub total_marks: i32,
    pub total_correct: i32,
    pub total_questions: i32,
    pub has_attempted: bool,
    pub submitted_at: DateTime<Utc>,
    pub result_ids: Vec<i64>,
}

/// Summary write: totals plus the result rows they were computed from.
#[derive(Debug, Clone)]
pub struct NewSummary {
    pub student_id: i64,
    pub exam_id: i64,
    pub totals: SummaryTotals,
    pub result_ids: Vec<i64>,
    pub submitted_at: DateTime<Utc>,
}

/// Per-attempt state: when the student opened the exam.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ExamAttempt {
    pub student_id: i64,
    pub exam_id: i64,
    pub started_at: DateTime<Utc>,
}

/// DTO for submitting an exam attempt.
#[derive(Debug, Deserialize)]
pub struct SubmitExamRequest {
    /// Key: Question ID
    /// Value: selected option id, or null for "not answered".
    pub answers: HashMap<i64, Option<i64>>,
}

/// Returned after a successful submission.
#[derive(Debug, Clone, Serialize)]
pub struct GradeReport {
    pub exam_id: i64,
    pub total_marks: i32,
    pub total_correct: i32,
    pub total_questions: i32,
    pub per_question: Vec<GradedAnswer>,
}

/// Exam listed for a student.
#[derive(Debug, Serialize)]
pub struct AvailableExam {
    #[serde(flatten)]
    pub exam: Exam,
    pub has_attempted: bool,
}

/// The paper handed out when a student starts an exam.
#[derive(Debug, Serialize)]
pub struct StartedExam {
    pub exam_id: i64,
    pub started_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub questions: Vec<PublicQuestion>,
}

/// Question-wise detail of a graded attempt.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerDetail {
    pub question_id: i64,
    pub question_text: String,
    pub marks: i32,
    /// Text of the chosen option, `None` when not answered.
    pub selected_option: Option<String>,
    pub correct_option: Option<String>,
    pub is_correct: bool,
    pub mark_obtains: i32,
}

#[derive(Debug, Serialize)]
pub struct ExamReport {
    pub summary: StudentExamSummary,
    pub details: Vec<AnswerDetail>,
}
