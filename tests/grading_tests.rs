// tests/grading_tests.rs

mod common;

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, TimeZone, Utc};

use campus::{
    models::{
        exam::{
            CreateExamRequest, CreateQuestionRequest, Exam, NewOption, QuestionWithOptions,
            UpdateQuestionRequest,
        },
        user::{NewUser, Role, User},
    },
    repositories::{ExamRepository, UserRepository},
    services::authz::Principal,
    state::AppState,
};
use common::{MemoryStore, test_state};

fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, hour, minute, 0).unwrap()
}

async fn user(store: &Arc<MemoryStore>, login_id: &str, role: Role) -> User {
    store
        .create_user(NewUser {
            login_id: login_id.to_string(),
            password_hash: "unused".to_string(),
            role,
            full_name: format!("User {}", login_id),
            department: "CSE".to_string(),
            semester: (role == Role::Student).then_some(5),
        })
        .await
        .unwrap()
}

fn principal(user: &User) -> Principal {
    Principal {
        id: user.id,
        role: user.role().unwrap(),
    }
}

fn option(text: &str, is_correct: bool) -> NewOption {
    NewOption {
        text: text.to_string(),
        is_correct,
    }
}

struct Fixture {
    store: Arc<MemoryStore>,
    state: AppState,
    teacher: User,
    student: User,
    exam: Exam,
    q1: QuestionWithOptions,
    q2: QuestionWithOptions,
}

impl Fixture {
    fn q1_correct(&self) -> i64 {
        self.q1.correct_option().unwrap().id
    }

    fn q1_wrong(&self) -> i64 {
        self.q1.options.iter().find(|o| !o.is_correct).unwrap().id
    }
}

/// Exam open 10:00 to 11:00 with Q1 worth 2 marks and Q2 worth 1.
async fn fixture() -> Fixture {
    let store = MemoryStore::new();
    let state = test_state(&store);
    let teacher = user(&store, "T100", Role::Faculty).await;
    let student = user(&store, "CS01", Role::Student).await;

    let exam = state
        .authoring
        .create_exam(
            &principal(&teacher),
            CreateExamRequest {
                title: "Operating Systems Quiz".to_string(),
                description: None,
                department: "CSE".to_string(),
                semester: 5,
                start_time: at(10, 0),
                end_time: at(11, 0),
                duration_minutes: 60,
            },
        )
        .await
        .unwrap();

    let q1 = state
        .authoring
        .add_question(
            exam.id,
            &principal(&teacher),
            CreateQuestionRequest {
                text: "Which scheduler is preemptive?".to_string(),
                marks: 2,
                options: vec![option("Round robin", true), option("FCFS", false)],
            },
        )
        .await
        .unwrap();

    let q2 = state
        .authoring
        .add_question(
            exam.id,
            &principal(&teacher),
            CreateQuestionRequest {
                text: "Page size on x86?".to_string(),
                marks: 1,
                options: vec![
                    option("4 KiB", true),
                    option("1 KiB", false),
                    option("64 KiB", false),
                ],
            },
        )
        .await
        .unwrap();

    Fixture {
        store,
        state,
        teacher,
        student,
        exam,
        q1,
        q2,
    }
}

#[tokio::test]
async fn submission_grades_every_question() {
    let f = fixture().await;
    let answers = HashMap::from([
        (f.q1.question.id, Some(f.q1_correct())),
        (f.q2.question.id, Some(999_999)),
    ]);

    let report = f
        .state
        .grading
        .grade_submission(f.exam.id, &f.student, &answers, at(10, 30))
        .await
        .unwrap();

    assert_eq!(report.total_marks, 2);
    assert_eq!(report.total_correct, 1);
    assert_eq!(report.total_questions, 2);
    assert_eq!(report.per_question.len(), 2);
    assert_eq!(report.per_question[0].question_id, f.q1.question.id);
    assert!(report.per_question[0].is_correct);
    assert_eq!(report.per_question[0].mark_obtains, 2);
    assert_eq!(report.per_question[1].question_id, f.q2.question.id);
    assert!(!report.per_question[1].is_correct);
    assert_eq!(report.per_question[1].mark_obtains, 0);
    assert_eq!(report.per_question[1].selected_option_id, None);
}

#[tokio::test]
async fn resubmission_overwrites_instead_of_duplicating() {
    let f = fixture().await;
    let first = HashMap::from([
        (f.q1.question.id, Some(f.q1_correct())),
        (f.q2.question.id, Some(999_999)),
    ]);
    f.state
        .grading
        .grade_submission(f.exam.id, &f.student, &first, at(10, 30))
        .await
        .unwrap();

    let second = HashMap::from([(f.q1.question.id, Some(f.q1_wrong()))]);
    let report = f
        .state
        .grading
        .grade_submission(f.exam.id, &f.student, &second, at(10, 45))
        .await
        .unwrap();

    assert_eq!(report.total_marks, 0);
    let rows = f.store.result_rows(f.student.id, f.exam.id).await;
    assert_eq!(rows.len(), 2);
    assert_eq!(f.store.summary_count(f.student.id, f.exam.id).await, 1);

    let q1_row = rows
        .iter()
        .find(|r| r.question_id == f.q1.question.id)
        .unwrap();
    assert_eq!(q1_row.selected_option_id, Some(f.q1_wrong()));
    assert_eq!(q1_row.submitted_at, at(10, 45));
}

#[tokio::test]
async fn grading_same_answers_twice_is_idempotent() {
    let f = fixture().await;
    let answers = HashMap::from([
        (f.q1.question.id, Some(f.q1_correct())),
        (f.q2.question.id, Some(f.q2.correct_option().unwrap().id)),
    ]);

    let first = f
        .state
        .grading
        .grade_submission(f.exam.id, &f.student, &answers, at(10, 20))
        .await
        .unwrap();
    let rows_before = f.store.result_rows(f.student.id, f.exam.id).await;

    let second = f
        .state
        .grading
        .grade_submission(f.exam.id, &f.student, &answers, at(10, 20))
        .await
        .unwrap();
    let rows_after = f.store.result_rows(f.student.id, f.exam.id).await;

    assert_eq!(first.per_question, second.per_question);
    assert_eq!(first.total_marks, 3);
    assert_eq!(second.total_marks, 3);
    assert_eq!(
        rows_before.iter().map(|r| r.id).collect::<Vec<_>>(),
        rows_after.iter().map(|r| r.id).collect::<Vec<_>>()
    );

    let summary = f
        .state
        .grading
        .recompute_summary(f.student.id, f.exam.id, at(10, 20))
        .await
        .unwrap();
    assert_eq!(summary.total_marks, 3);
    assert_eq!(summary.total_correct, 2);
    assert!(summary.has_attempted);
    assert_eq!(summary.result_ids.len(), 2);
}

#[tokio::test]
async fn late_submission_is_rejected_and_leaves_rows_untouched() {
    let f = fixture().await;
    let answers = HashMap::from([(f.q1.question.id, Some(f.q1_correct()))]);
    f.state
        .grading
        .grade_submission(f.exam.id, &f.student, &answers, at(10, 30))
        .await
        .unwrap();
    let before = f.store.result_rows(f.student.id, f.exam.id).await;

    let changed = HashMap::from([(f.q1.question.id, Some(f.q1_wrong()))]);
    let err = f
        .state
        .grading
        .grade_submission(f.exam.id, &f.student, &changed, at(11, 1))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "SUBMISSION_WINDOW_CLOSED");

    let after = f.store.result_rows(f.student.id, f.exam.id).await;
    assert_eq!(before.len(), after.len());
    for (b, a) in before.iter().zip(after.iter()) {
        assert_eq!(b.selected_option_id, a.selected_option_id);
        assert_eq!(b.mark_obtains, a.mark_obtains);
    }
}

#[tokio::test]
async fn early_submission_is_rejected() {
    let f = fixture().await;
    let err = f
        .state
        .grading
        .grade_submission(f.exam.id, &f.student, &HashMap::new(), at(9, 59))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "SUBMISSION_WINDOW_CLOSED");
    assert!(f.store.result_rows(f.student.id, f.exam.id).await.is_empty());
}

#[tokio::test]
async fn submission_at_end_time_is_accepted() {
    let f = fixture().await;
    let report = f
        .state
        .grading
        .grade_submission(f.exam.id, &f.student, &HashMap::new(), at(11, 0))
        .await
        .unwrap();
    assert_eq!(report.total_marks, 0);
    assert_eq!(report.total_questions, 2);
}

#[tokio::test]
async fn attempt_duration_closes_the_window_early() {
    let store = MemoryStore::new();
    let state = test_state(&store);
    let teacher = user(&store, "T200", Role::Faculty).await;
    let student = user(&store, "CS02", Role::Student).await;
    let exam = state
        .authoring
        .create_exam(
            &principal(&teacher),
            CreateExamRequest {
                title: "Short quiz".to_string(),
                description: None,
                department: "CSE".to_string(),
                semester: 5,
                start_time: at(10, 0),
                end_time: at(11, 0),
                duration_minutes: 15,
            },
        )
        .await
        .unwrap();

    let started = state
        .grading
        .start_exam(exam.id, &student, at(10, 10))
        .await
        .unwrap();
    assert_eq!(started.deadline, at(10, 25));

    // Restarting keeps the original attempt
    let again = state
        .grading
        .start_exam(exam.id, &student, at(10, 20))
        .await
        .unwrap();
    assert_eq!(again.started_at, at(10, 10));

    let err = state
        .grading
        .grade_submission(exam.id, &student, &HashMap::new(), at(10, 30))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "SUBMISSION_WINDOW_CLOSED");
}

#[tokio::test]
async fn total_marks_equals_sum_over_n_rows() {
    let store = MemoryStore::new();
    let state = test_state(&store);
    let teacher = user(&store, "T300", Role::Faculty).await;
    let student = user(&store, "CS03", Role::Student).await;
    let exam = state
        .authoring
        .create_exam(
            &principal(&teacher),
            CreateExamRequest {
                title: "Long quiz".to_string(),
                description: None,
                department: "CSE".to_string(),
                semester: 5,
                start_time: at(10, 0),
                end_time: at(11, 0),
                duration_minutes: 60,
            },
        )
        .await
        .unwrap();

    let mut answers = HashMap::new();
    for marks in 1..=6 {
        let q = state
            .authoring
            .add_question(
                exam.id,
                &principal(&teacher),
                CreateQuestionRequest {
                    text: format!("Question worth {}", marks),
                    marks,
                    options: vec![option("right", true), option("wrong", false)],
                },
            )
            .await
            .unwrap();
        // Answer the even-mark questions correctly, skip the rest
        if marks % 2 == 0 {
            answers.insert(q.question.id, Some(q.correct_option().unwrap().id));
        }
    }

    let report = state
        .grading
        .grade_submission(exam.id, &student, &answers, at(10, 5))
        .await
        .unwrap();

    let rows = store.result_rows(student.id, exam.id).await;
    assert_eq!(rows.len(), 6);
    assert_eq!(report.total_marks, 2 + 4 + 6);
    assert_eq!(
        report.total_marks,
        rows.iter().map(|r| r.mark_obtains).sum::<i32>()
    );
    assert_eq!(report.total_correct, 3);
}

#[tokio::test]
async fn report_shows_chosen_and_correct_options() {
    let f = fixture().await;
    let answers = HashMap::from([(f.q1.question.id, Some(f.q1_wrong()))]);
    f.state
        .grading
        .grade_submission(f.exam.id, &f.student, &answers, at(10, 30))
        .await
        .unwrap();

    let report = f
        .state
        .grading
        .exam_report(f.exam.id, f.student.id)
        .await
        .unwrap();
    assert_eq!(report.details.len(), 2);
    assert_eq!(report.details[0].selected_option.as_deref(), Some("FCFS"));
    assert_eq!(report.details[0].correct_option.as_deref(), Some("Round robin"));
    assert_eq!(report.details[1].selected_option, None);

    let results = f
        .state
        .grading
        .exam_results(f.exam.id, &principal(&f.teacher))
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].student_id, f.student.id);
}

#[tokio::test]
async fn report_without_attempt_is_not_found() {
    let f = fixture().await;
    let err = f
        .state
        .grading
        .exam_report(f.exam.id, f.student.id)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");
}

#[tokio::test]
async fn exam_of_another_class_cannot_be_taken() {
    let f = fixture().await;
    let outsider = f
        .store
        .create_user(NewUser {
            login_id: "ME07".to_string(),
            password_hash: "unused".to_string(),
            role: Role::Student,
            full_name: "Mech Student".to_string(),
            department: "MECH".to_string(),
            semester: Some(5),
        })
        .await
        .unwrap();

    let err = f
        .state
        .grading
        .grade_submission(f.exam.id, &outsider, &HashMap::new(), at(10, 30))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "NOT_AUTHORIZED");

    let available = f
        .state
        .grading
        .available_exams(&f.student, at(10, 30))
        .await
        .unwrap();
    assert_eq!(available.len(), 1);
    assert!(!available[0].has_attempted);
    assert!(
        f.state
            .grading
            .available_exams(&f.student, at(11, 30))
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn question_marks_are_capped() {
    let f = fixture().await;

    let err = f
        .state
        .authoring
        .add_question(
            f.exam.id,
            &principal(&f.teacher),
            CreateQuestionRequest {
                text: "Worth everything".to_string(),
                marks: i32::MAX,
                options: vec![option("yes", true), option("no", false)],
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_INPUT");

    let err = f
        .state
        .authoring
        .update_question(
            f.q2.question.id,
            &principal(&f.teacher),
            UpdateQuestionRequest {
                marks: Some(1001),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_INPUT");

    let capped = f
        .state
        .authoring
        .add_question(
            f.exam.id,
            &principal(&f.teacher),
            CreateQuestionRequest {
                text: "Final question".to_string(),
                marks: 1000,
                options: vec![option("yes", true), option("no", false)],
            },
        )
        .await
        .unwrap();
    assert_eq!(capped.question.marks, 1000);
}

#[tokio::test]
async fn overflowing_total_is_rejected_before_writing() {
    let f = fixture().await;
    // Stored directly, past the request validation
    let huge = f
        .store
        .create_question(
            f.exam.id,
            "Legacy question",
            i32::MAX,
            &[option("yes", true), option("no", false)],
        )
        .await
        .unwrap();

    let answers = HashMap::from([
        (f.q1.question.id, Some(f.q1_correct())),
        (huge.question.id, Some(huge.correct_option().unwrap().id)),
    ]);
    let err = f
        .state
        .grading
        .grade_submission(f.exam.id, &f.student, &answers, at(10, 30))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "INVALID_INPUT");
    assert!(f.store.result_rows(f.student.id, f.exam.id).await.is_empty());
    assert_eq!(f.store.summary_count(f.student.id, f.exam.id).await, 0);
}
