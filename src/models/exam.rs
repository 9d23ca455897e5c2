// src/models/exam.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'exams' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Exam {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,

    /// Owning faculty member. Only they may change the exam or its questions.
    pub teacher_id: i64,

    /// Stored on the exam so it survives the teacher changing department.
    pub department: String,
    pub semester: i32,

    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_minutes: i32,

    pub created_at: DateTime<Utc>,
}

/// Fields needed to insert an exam.
#[derive(Debug, Clone)]
pub struct NewExam {
    pub teacher_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub department: String,
    pub semester: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_minutes: i32,
}

/// Represents the 'questions' table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub exam_id: i64,
    pub text: String,
    pub marks: i32,
}

/// Represents the 'options' table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AnswerOption {
    pub id: i64,
    pub question_id: i64,
    pub text: String,
    pub is_correct: bool,
}

/// A question together with its full option set, answer key included.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionWithOptions {
    #[serde(flatten)]
    pub question: Question,
    pub options: Vec<AnswerOption>,
}

impl QuestionWithOptions {
    pub fn option(&self, option_id: i64) -> Option<&AnswerOption> {
        self.options.iter().find(|o| o.id == option_id)
    }

    pub fn correct_option(&self) -> Option<&AnswerOption> {
        self.options.iter().find(|o| o.is_correct)
    }
}

/// Option as shown to a student (no answer key).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicOption {
    pub id: i64,
    pub text: String,
}

/// DTO for sending a question to a student (excludes the correct flag).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub text: String,
    pub marks: i32,
    pub options: Vec<PublicOption>,
}

impl From<QuestionWithOptions> for PublicQuestion {
    fn from(q: QuestionWithOptions) -> Self {
        PublicQuestion {
            id: q.question.id,
            text: q.question.text,
            marks: q.question.marks,
            options: q
                .options
                .into_iter()
                .map(|o| PublicOption {
                    id: o.id,
                    text: o.text,
                })
                .collect(),
        }
    }
}

/// An exam with its questions, for the owning teacher.
#[derive(Debug, Serialize)]
pub struct ExamDetail {
    #[serde(flatten)]
    pub exam: Exam,
    pub questions: Vec<QuestionWithOptions>,
}

/// DTO for creating a new exam.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateExamRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub department: String,
    #[validate(range(min = 1, max = 12))]
    pub semester: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[validate(range(min = 1, message = "Duration must be at least one minute."))]
    pub duration_minutes: i32,
}

/// DTO for updating an exam. Fields are optional.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateExamRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(range(min = 1, max = 12))]
    pub semester: Option<i32>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    #[validate(range(min = 1))]
    pub duration_minutes: Option<i32>,
}

/// One option in an authored option set.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewOption {
    #[validate(length(min = 1, max = 255))]
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

/// DTO for adding a question to an exam.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 5000))]
    pub text: String,
    #[serde(default = "default_marks")]
    #[validate(range(min = 1, max = 1000, message = "Marks must be between 1 and 1000."))]
    pub marks: i32,
    #[validate(nested)]
    pub options: Vec<NewOption>,
}

/// DTO for updating a question. A present `options` replaces the whole set.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateQuestionRequest {
    #[validate(length(min = 1, max = 5000))]
    pub text: Option<String>,
    #[validate(range(min = 1, max = 1000, message = "Marks must be between 1 and 1000."))]
    pub marks: Option<i32>,
    #[validate(nested)]
    pub options: Option<Vec<NewOption>>,
}

fn default_marks() -> i32 {
    1
}
