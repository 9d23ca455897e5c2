//! Exam and question authoring for faculty.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use validator::Validate;

use crate::{
    config::{MAX_OPTION_TEXT_LEN, MAX_OPTIONS_PER_QUESTION, MIN_OPTIONS_PER_QUESTION},
    error::{AppError, AppResult},
    models::{
        exam::{
            CreateExamRequest, CreateQuestionRequest, Exam, ExamDetail, NewExam, NewOption,
            QuestionWithOptions, UpdateExamRequest, UpdateQuestionRequest,
        },
        user::Role,
    },
    repositories::ExamRepository,
    services::authz::Principal,
    utils::html::{clean_html, clean_optional},
};

/// An option set is valid with 2..=4 options of which exactly one is correct.
pub fn validate_option_set(options: &[NewOption]) -> AppResult<()> {
    if options.len() < MIN_OPTIONS_PER_QUESTION {
        return Err(AppError::InvalidInput(format!(
            "A question needs at least {} options",
            MIN_OPTIONS_PER_QUESTION
        )));
    }
    if options.len() > MAX_OPTIONS_PER_QUESTION {
        return Err(AppError::InvalidInput(format!(
            "A question can have at most {} options",
            MAX_OPTIONS_PER_QUESTION
        )));
    }
    let correct = options.iter().filter(|o| o.is_correct).count();
    if correct != 1 {
        return Err(AppError::InvalidInput(format!(
            "Exactly one option must be correct, found {}",
            correct
        )));
    }
    Ok(())
}

fn validate_window(start: &DateTime<Utc>, end: &DateTime<Utc>) -> AppResult<()> {
    if start >= end {
        return Err(AppError::InvalidInput(
            "Exam start time must be before its end time".to_string(),
        ));
    }
    Ok(())
}

/// Cleaned option texts; entities may lengthen a text past the column width.
fn sanitize_options(options: &[NewOption]) -> AppResult<Vec<NewOption>> {
    options
        .iter()
        .map(|o| {
            let text = clean_html(&o.text);
            if text.chars().count() > MAX_OPTION_TEXT_LEN {
                return Err(AppError::InvalidInput(format!(
                    "Option text is longer than {} characters once escaped",
                    MAX_OPTION_TEXT_LEN
                )));
            }
            Ok(NewOption {
                text,
                is_correct: o.is_correct,
            })
        })
        .collect()
}

pub struct ExamAuthoringService {
    exams: Arc<dyn ExamRepository>,
}

impl ExamAuthoringService {
    pub fn new(exams: Arc<dyn ExamRepository>) -> Self {
        Self { exams }
    }

    /// Loads an exam and checks the principal owns it.
    async fn owned_exam(&self, exam_id: i64, principal: &Principal) -> AppResult<Exam> {
        let exam = self
            .exams
            .find_exam(exam_id)
            .await?
            .ok_or(AppError::NotFound("Exam not found".to_string()))?;
        principal.ensure_owner(exam.teacher_id, "exam")?;
        Ok(exam)
    }

    pub async fn create_exam(
        &self,
        principal: &Principal,
        req: CreateExamRequest,
    ) -> AppResult<Exam> {
        principal.require_role(Role::Faculty)?;
        req.validate()?;
        validate_window(&req.start_time, &req.end_time)?;

        let exam = self
            .exams
            .create_exam(NewExam {
                teacher_id: principal.id,
                title: req.title,
                description: clean_optional(req.description.as_deref()),
                department: req.department,
                semester: req.semester,
                start_time: req.start_time,
                end_time: req.end_time,
                duration_minutes: req.duration_minutes,
            })
            .await?;

        tracing::info!(exam = exam.id, teacher = principal.id, "Exam created");
        Ok(exam)
    }

    pub async fn list_my_exams(&self, principal: &Principal) -> AppResult<Vec<Exam>> {
        principal.require_role(Role::Faculty)?;
        self.exams.list_exams_by_teacher(principal.id).await
    }

    pub async fn get_exam(&self, exam_id: i64, principal: &Principal) -> AppResult<ExamDetail> {
        let exam = self.owned_exam(exam_id, principal).await?;
        let questions = self.exams.list_questions(exam.id).await?;
        Ok(ExamDetail { exam, questions })
    }

    pub async fn update_exam(
        &self,
        exam_id: i64,
        principal: &Principal,
        req: UpdateExamRequest,
    ) -> AppResult<Exam> {
        req.validate()?;
        let mut exam = self.owned_exam(exam_id, principal).await?;

        if let Some(title) = req.title {
            exam.title = title;
        }
        if let Some(description) = req.description {
            exam.description = Some(clean_html(&description));
        }
        if let Some(semester) = req.semester {
            exam.semester = semester;
        }
        if let Some(start_time) = req.start_time {
            exam.start_time = start_time;
        }
        if let Some(end_time) = req.end_time {
            exam.end_time = end_time;
        }
        if let Some(duration) = req.duration_minutes {
            exam.duration_minutes = duration;
        }
        validate_window(&exam.start_time, &exam.end_time)?;

        self.exams.update_exam(&exam).await
    }

    pub async fn delete_exam(&self, exam_id: i64, principal: &Principal) -> AppResult<()> {
        let exam = self.owned_exam(exam_id, principal).await?;
        if !self.exams.delete_exam(exam.id).await? {
            return Err(AppError::NotFound("Exam not found".to_string()));
        }
        tracing::info!(exam = exam.id, "Exam deleted with its questions and results");
        Ok(())
    }

    pub async fn add_question(
        &self,
        exam_id: i64,
        principal: &Principal,
        req: CreateQuestionRequest,
    ) -> AppResult<QuestionWithOptions> {
        req.validate()?;
        validate_option_set(&req.options)?;
        let exam = self.owned_exam(exam_id, principal).await?;

        let options = sanitize_options(&req.options)?;
        self.exams
            .create_question(exam.id, &clean_html(&req.text), req.marks, &options)
            .await
    }

    pub async fn update_question(
        &self,
        question_id: i64,
        principal: &Principal,
        req: UpdateQuestionRequest,
    ) -> AppResult<QuestionWithOptions> {
        req.validate()?;
        if let Some(options) = &req.options {
            validate_option_set(options)?;
        }

        let mut question = self
            .exams
            .find_question(question_id)
            .await?
            .ok_or(AppError::NotFound("Question not found".to_string()))?;
        self.owned_exam(question.exam_id, principal).await?;

        if let Some(text) = req.text {
            question.text = clean_html(&text);
        }
        if let Some(marks) = req.marks {
            question.marks = marks;
        }
        let options = req.options.as_deref().map(sanitize_options).transpose()?;

        self.exams
            .update_question(&question, options.as_deref())
            .await
    }

    pub async fn delete_question(
        &self,
        exam_id: i64,
        question_id: i64,
        principal: &Principal,
    ) -> AppResult<()> {
        let exam = self.owned_exam(exam_id, principal).await?;
        let question = self
            .exams
            .find_question(question_id)
            .await?
            .filter(|q| q.exam_id == exam.id)
            .ok_or(AppError::NotFound(
                "Question not found in this exam".to_string(),
            ))?;

        self.exams.delete_question(question.id).await?;
        Ok(())
    }
}
