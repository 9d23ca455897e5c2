//! Exam taking and grading.
//!
//! A submission is scored against the stored answer key, every question of the
//! exam gets exactly one result row per student (upserted), and the summary is
//! always recomputed from the full current row set so repeated grading of the
//! same answers is idempotent.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use chrono::{DateTime, Duration, Utc};

use crate::{
    error::{AppError, AppResult},
    models::{
        exam::{Exam, PublicQuestion, QuestionWithOptions},
        result::{
            AnswerDetail, AvailableExam, ExamAttempt, ExamReport, GradeReport, GradedAnswer,
            NewResult, NewSummary, StartedExam, StudentExamResult, StudentExamSummary,
            SummaryTotals,
        },
        user::{Role, User},
    },
    repositories::{ExamRepository, ResultRepository},
    services::authz::Principal,
};

/// Scores every question of the exam, answered or not.
///
/// A missing answer, an explicit `None`, or an option id that does not belong
/// to the question all grade as "not answered" with zero marks.
pub fn grade_answers(
    questions: &[QuestionWithOptions],
    answers: &HashMap<i64, Option<i64>>,
) -> Vec<GradedAnswer> {
    questions
        .iter()
        .map(|q| {
            let chosen = answers
                .get(&q.question.id)
                .copied()
                .flatten()
                .and_then(|option_id| q.option(option_id));

            match chosen {
                Some(option) => GradedAnswer {
                    question_id: q.question.id,
                    selected_option_id: Some(option.id),
                    is_correct: option.is_correct,
                    mark_obtains: if option.is_correct { q.question.marks } else { 0 },
                },
                None => GradedAnswer {
                    question_id: q.question.id,
                    selected_option_id: None,
                    is_correct: false,
                    mark_obtains: 0,
                },
            }
        })
        .collect()
}

/// Totals over the stored result rows of one (student, exam) pair.
///
/// Fails instead of wrapping when a total does not fit the summary columns.
pub fn summarize(rows: &[StudentExamResult]) -> AppResult<SummaryTotals> {
    let overflow = || AppError::InvalidInput("Exam totals exceed the supported range".to_string());

    let mut totals = SummaryTotals {
        total_questions: i32::try_from(rows.len()).map_err(|_| overflow())?,
        ..Default::default()
    };
    for row in rows.iter().filter(|r| r.is_correct) {
        totals.total_marks = totals
            .total_marks
            .checked_add(row.mark_obtains)
            .ok_or_else(overflow)?;
        totals.total_correct += 1;
    }
    Ok(totals)
}

/// Last instant a submission is accepted.
///
/// Without an attempt this is the exam's `end_time`; once the student has
/// started, the attempt's duration may close it earlier.
pub fn attempt_deadline(exam: &Exam, attempt: Option<&ExamAttempt>) -> DateTime<Utc> {
    match attempt {
        Some(a) => {
            let by_duration = a.started_at + Duration::minutes(i64::from(exam.duration_minutes));
            by_duration.min(exam.end_time)
        }
        None => exam.end_time,
    }
}

pub fn ensure_window_open(
    exam: &Exam,
    attempt: Option<&ExamAttempt>,
    now: DateTime<Utc>,
) -> AppResult<()> {
    if now < exam.start_time {
        return Err(AppError::SubmissionWindowClosed(format!(
            "Exam '{}' has not started yet",
            exam.title
        )));
    }
    if now > attempt_deadline(exam, attempt) {
        return Err(AppError::SubmissionWindowClosed(format!(
            "The submission window for exam '{}' is closed",
            exam.title
        )));
    }
    Ok(())
}

fn ensure_enrolled(exam: &Exam, student: &User) -> AppResult<()> {
    if student.role() != Some(Role::Student) {
        return Err(AppError::NotAuthorized(
            "Only students can take exams".to_string(),
        ));
    }
    if student.department != exam.department || student.semester != Some(exam.semester) {
        return Err(AppError::NotAuthorized(
            "This exam is not offered to your class".to_string(),
        ));
    }
    Ok(())
}

pub struct GradingService {
    exams: Arc<dyn ExamRepository>,
    results: Arc<dyn ResultRepository>,
}

impl GradingService {
    pub fn new(exams: Arc<dyn ExamRepository>, results: Arc<dyn ResultRepository>) -> Self {
        Self { exams, results }
    }

    async fn load_exam(&self, exam_id: i64) -> AppResult<Exam> {
        self.exams
            .find_exam(exam_id)
            .await?
            .ok_or(AppError::NotFound("Exam not found".to_string()))
    }

    /// Exams of the student's class that have not ended yet.
    pub async fn available_exams(
        &self,
        student: &User,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<AvailableExam>> {
        let Some(semester) = student.semester else {
            return Ok(Vec::new());
        };

        let attempted: HashSet<i64> = self
            .results
            .attempted_exam_ids(student.id)
            .await?
            .into_iter()
            .collect();

        Ok(self
            .exams
            .list_exams_for_class(&student.department, semester)
            .await?
            .into_iter()
            .filter(|exam| exam.end_time >= now)
            .map(|exam| AvailableExam {
                has_attempted: attempted.contains(&exam.id),
                exam,
            })
            .collect())
    }

    /// Opens (or re-opens) an attempt and hands out the paper without the answer key.
    pub async fn start_exam(
        &self,
        exam_id: i64,
        student: &User,
        now: DateTime<Utc>,
    ) -> AppResult<StartedExam> {
        let exam = self.load_exam(exam_id).await?;
        ensure_enrolled(&exam, student)?;
        ensure_window_open(&exam, None, now)?;

        let attempt = self.results.start_attempt(student.id, exam.id, now).await?;
        ensure_window_open(&exam, Some(&attempt), now)?;

        let questions = self
            .exams
            .list_questions(exam.id)
            .await?
            .into_iter()
            .map(PublicQuestion::from)
            .collect();

        tracing::info!(student = student.id, exam = exam.id, "Exam attempt started");

        Ok(StartedExam {
            exam_id: exam.id,
            started_at: attempt.started_at,
            deadline: attempt_deadline(&exam, Some(&attempt)),
            questions,
        })
    }

    /// Grades a submission and persists one result row per question plus the summary.
    ///
    /// The window is checked before anything is written, so a rejected
    /// submission leaves earlier results untouched.
    pub async fn grade_submission(
        &self,
        exam_id: i64,
        student: &User,
        answers: &HashMap<i64, Option<i64>>,
        now: DateTime<Utc>,
    ) -> AppResult<GradeReport> {
        let exam = self.load_exam(exam_id).await?;
        ensure_enrolled(&exam, student)?;

        let attempt = self.results.find_attempt(student.id, exam.id).await?;
        if let Err(e) = ensure_window_open(&exam, attempt.as_ref(), now) {
            tracing::warn!(student = student.id, exam = exam.id, "Submission rejected: {}", e);
            return Err(e);
        }

        let questions = self.exams.list_questions(exam.id).await?;
        let graded = grade_answers(&questions, answers);
        graded
            .iter()
            .try_fold(0i32, |total, a| total.checked_add(a.mark_obtains))
            .ok_or_else(|| {
                AppError::InvalidInput("Exam totals exceed the supported range".to_string())
            })?;

        let known: HashSet<i64> = questions.iter().map(|q| q.question.id).collect();
        let unknown = answers.keys().filter(|id| !known.contains(id)).count();
        if unknown > 0 {
            tracing::debug!(exam = exam.id, unknown, "Ignoring answers to unknown questions");
        }

        for answer in &graded {
            self.results
                .upsert_result(NewResult {
                    student_id: student.id,
                    exam_id: exam.id,
                    answer: answer.clone(),
                    submitted_at: now,
                })
                .await?;
        }

        let summary = self.recompute_summary(student.id, exam.id, now).await?;

        tracing::info!(
            student = student.id,
            exam = exam.id,
            total_marks = summary.total_marks,
            "Exam submission graded"
        );

        Ok(GradeReport {
            exam_id: exam.id,
            total_marks: summary.total_marks,
            total_correct: summary.total_correct,
            total_questions: summary.total_questions,
            per_question: graded,
        })
    }

    /// Rebuilds the (student, exam) summary from the stored result rows.
    pub async fn recompute_summary(
        &self,
        student_id: i64,
        exam_id: i64,
        now: DateTime<Utc>,
    ) -> AppResult<StudentExamSummary> {
        let rows = self.results.list_results(student_id, exam_id).await?;
        let totals = summarize(&rows)?;

        self.results
            .upsert_summary(NewSummary {
                student_id,
                exam_id,
                totals,
                result_ids: rows.iter().map(|r| r.id).collect(),
                submitted_at: now,
            })
            .await
    }

    /// The student's own graded attempt with question-wise details.
    pub async fn exam_report(&self, exam_id: i64, student_id: i64) -> AppResult<ExamReport> {
        let summary = self
            .results
            .find_summary(student_id, exam_id)
            .await?
            .ok_or(AppError::NotFound(
                "You have not attempted this exam".to_string(),
            ))?;

        let questions: HashMap<i64, QuestionWithOptions> = self
            .exams
            .list_questions(exam_id)
            .await?
            .into_iter()
            .map(|q| (q.question.id, q))
            .collect();

        let details = self
            .results
            .list_results(student_id, exam_id)
            .await?
            .into_iter()
            .filter_map(|row| {
                let q = questions.get(&row.question_id)?;
                Some(AnswerDetail {
                    question_id: row.question_id,
                    question_text: q.question.text.clone(),
                    marks: q.question.marks,
                    selected_option: row
                        .selected_option_id
                        .and_then(|id| q.option(id))
                        .map(|o| o.text.clone()),
                    correct_option: q.correct_option().map(|o| o.text.clone()),
                    is_correct: row.is_correct,
                    mark_obtains: row.mark_obtains,
                })
            })
            .collect();

        Ok(ExamReport { summary, details })
    }

    /// Every student summary of an exam, for its owning teacher.
    pub async fn exam_results(
        &self,
        exam_id: i64,
        principal: &Principal,
    ) -> AppResult<Vec<StudentExamSummary>> {
        let exam = self.load_exam(exam_id).await?;
        principal.ensure_owner(exam.teacher_id, "exam")?;
        self.results.list_summaries_for_exam(exam.id).await
    }
}
