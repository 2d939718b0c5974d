//! Attempt lifecycle: start, ordered read, submit, summary.
//!
//! Every operation runs on a connection the caller has already opened a
//! transaction on, so the caller decides when the unit of work commits.

use std::collections::HashMap;

use sqlx::PgConnection;
use thiserror::Error;
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::db::models::{Attempt, Question, QuestionOption, Quiz};
use crate::db::types::{QuestionType, QuizStatus};
use crate::repositories;
use crate::repositories::answers::AnswerReviewRow;
use crate::repositories::attempts::{CreateAttempt, PaperRow};
use crate::services::grading::{self, AnswerOption, CorrectAnswer, GradableQuestion, GradeOutcome};
use crate::services::ordering;
use crate::services::scoring::{self, SummaryStatistics};

#[derive(Debug, Error)]
pub(crate) enum AttemptError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("attempt {attempt_id} already started")]
    AlreadyStarted { attempt_id: String },
    #[error("attempt already submitted")]
    AlreadySubmitted,
    #[error("quiz is closed")]
    QuizClosed,
    #[error("attempt not started")]
    NotStarted,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub(crate) struct PaperQuestion {
    pub(crate) question: Question,
    /// Authoring order.
    pub(crate) options: Vec<QuestionOption>,
}

pub(crate) struct OrderedPaper {
    pub(crate) quiz: Quiz,
    pub(crate) questions: Vec<PaperQuestion>,
}

pub(crate) struct SubmittedAttempt {
    pub(crate) attempt: Attempt,
    pub(crate) outcome: GradeOutcome,
}

pub(crate) struct ReviewedAnswer {
    pub(crate) question_id: String,
    pub(crate) question_text: String,
    pub(crate) correct_answer: Option<CorrectAnswer>,
    pub(crate) given_answer: String,
    pub(crate) is_correct: bool,
    pub(crate) marks_awarded: i32,
    pub(crate) feedback: Option<String>,
}

pub(crate) struct AttemptSummary {
    pub(crate) quiz: Quiz,
    pub(crate) attempt: Attempt,
    pub(crate) statistics: SummaryStatistics,
    pub(crate) answers: Vec<ReviewedAnswer>,
}

async fn find_visible_quiz(conn: &mut PgConnection, quiz_id: &str) -> Result<Quiz, AttemptError> {
    match repositories::quizzes::find_by_id(&mut *conn, quiz_id).await? {
        Some(quiz) if quiz.is_active => Ok(quiz),
        _ => Err(AttemptError::NotFound("Quiz")),
    }
}

/// Creates the learner's single attempt and freezes its question order.
///
/// A second call for the same pair fails with `AlreadyStarted` carrying the
/// existing attempt id; the frozen order is never regenerated.
pub(crate) async fn start_attempt(
    conn: &mut PgConnection,
    quiz_id: &str,
    learner_id: &str,
    now: PrimitiveDateTime,
) -> Result<Attempt, AttemptError> {
    let quiz = find_visible_quiz(conn, quiz_id).await?;
    if quiz.status == QuizStatus::Completed {
        return Err(AttemptError::QuizClosed);
    }

    repositories::attempts::acquire_quiz_learner_lock(&mut *conn, quiz_id, learner_id).await?;

    if let Some(existing) =
        repositories::attempts::find_by_quiz_and_learner(&mut *conn, quiz_id, learner_id).await?
    {
        return Err(AttemptError::AlreadyStarted { attempt_id: existing.id });
    }

    let assigned = repositories::quizzes::list_question_ids(&mut *conn, quiz_id).await?;
    let order_seed = ordering::new_seed();
    let order = ordering::freeze_order(&assigned, quiz.random_order, order_seed);

    let attempt_id = Uuid::new_v4().to_string();
    let created = repositories::attempts::create(
        &mut *conn,
        CreateAttempt { id: &attempt_id, quiz_id, learner_id, order_seed, started_at: now },
    )
    .await?;

    if !created {
        let existing =
            repositories::attempts::find_by_quiz_and_learner(&mut *conn, quiz_id, learner_id)
                .await?
                .ok_or(AttemptError::NotStarted)?;
        return Err(AttemptError::AlreadyStarted { attempt_id: existing.id });
    }

    repositories::attempts::insert_order(&mut *conn, &attempt_id, &order).await?;

    metrics::counter!(crate::core::metrics::ATTEMPTS_STARTED).increment(1);
    tracing::info!(
        attempt_id = %attempt_id,
        quiz_id,
        learner_id,
        questions = order.len(),
        randomized = quiz.random_order,
        "Attempt started"
    );

    Ok(Attempt {
        id: attempt_id,
        quiz_id: quiz_id.to_string(),
        learner_id: learner_id.to_string(),
        order_seed,
        started_at: now,
        submitted_at: None,
        score: 0.0,
    })
}

/// The learner's questions in their frozen order.
pub(crate) async fn ordered_questions(
    conn: &mut PgConnection,
    quiz_id: &str,
    learner_id: &str,
) -> Result<OrderedPaper, AttemptError> {
    let quiz = find_visible_quiz(conn, quiz_id).await?;

    let attempt =
        repositories::attempts::find_by_quiz_and_learner(&mut *conn, quiz_id, learner_id)
            .await?
            .ok_or(AttemptError::NotStarted)?;

    let order = repositories::attempts::list_order(&mut *conn, &attempt.id).await?;
    let questions = repositories::questions::list_by_ids(&mut *conn, &order).await?;
    let options = repositories::questions::list_options_by_questions(&mut *conn, &order).await?;

    Ok(OrderedPaper { quiz, questions: arrange_paper(&order, questions, options) })
}

/// Grades the submission against the frozen order and closes the attempt.
pub(crate) async fn submit_attempt(
    conn: &mut PgConnection,
    quiz_id: &str,
    learner_id: &str,
    answers: &HashMap<String, String>,
    now: PrimitiveDateTime,
) -> Result<SubmittedAttempt, AttemptError> {
    let quiz = repositories::quizzes::find_by_id(&mut *conn, quiz_id)
        .await?
        .ok_or(AttemptError::NotFound("Quiz"))?;

    let attempt = repositories::attempts::find_for_update(&mut *conn, quiz_id, learner_id)
        .await?
        .ok_or(AttemptError::NotStarted)?;
    if attempt.is_submitted() {
        return Err(AttemptError::AlreadySubmitted);
    }

    let rows = repositories::attempts::list_paper(&mut *conn, quiz_id, &attempt.id).await?;
    let question_ids: Vec<String> = rows.iter().map(|row| row.question_id.clone()).collect();
    let options =
        repositories::questions::list_options_by_questions(&mut *conn, &question_ids).await?;
    let paper = gradable_paper(rows, options);

    let outcome = grading::grade(&paper, answers);
    let score = scoring::finalize_score(outcome.raw_score, outcome.max_raw_score, quiz.total_marks);

    repositories::answers::insert_many(&mut *conn, &attempt.id, &outcome.answers).await?;
    let attempt =
        repositories::attempts::mark_submitted(&mut *conn, &attempt.id, now, score).await?;

    metrics::counter!(crate::core::metrics::ATTEMPTS_SUBMITTED).increment(1);
    tracing::info!(
        attempt_id = %attempt.id,
        quiz_id,
        learner_id,
        answered = outcome.answers.len(),
        raw_score = outcome.raw_score,
        max_raw_score = outcome.max_raw_score,
        score,
        "Attempt submitted"
    );

    Ok(SubmittedAttempt { attempt, outcome })
}

/// The learner's graded answers alongside live statistics for the quiz.
pub(crate) async fn attempt_summary(
    conn: &mut PgConnection,
    quiz_id: &str,
    learner_id: &str,
) -> Result<AttemptSummary, AttemptError> {
    let quiz = repositories::quizzes::find_by_id(&mut *conn, quiz_id)
        .await?
        .ok_or(AttemptError::NotFound("Quiz"))?;

    let attempt =
        repositories::attempts::find_by_quiz_and_learner(&mut *conn, quiz_id, learner_id)
            .await?
            .ok_or(AttemptError::NotFound("Attempt"))?;

    let statistics = score_statistics(conn, quiz_id).await?;

    let rows = repositories::answers::list_for_review(&mut *conn, &attempt.id).await?;
    let question_ids: Vec<String> = rows.iter().map(|row| row.question_id.clone()).collect();
    let options =
        repositories::questions::list_options_by_questions(&mut *conn, &question_ids).await?;

    Ok(AttemptSummary { quiz, attempt, statistics, answers: review_answers(rows, options) })
}

/// Instructor view of the same aggregate the summary shows.
pub(crate) async fn quiz_statistics(
    conn: &mut PgConnection,
    quiz_id: &str,
) -> Result<(Quiz, SummaryStatistics), AttemptError> {
    let quiz = repositories::quizzes::find_by_id(&mut *conn, quiz_id)
        .await?
        .ok_or(AttemptError::NotFound("Quiz"))?;
    let statistics = score_statistics(conn, quiz_id).await?;
    Ok((quiz, statistics))
}

async fn score_statistics(
    conn: &mut PgConnection,
    quiz_id: &str,
) -> Result<SummaryStatistics, sqlx::Error> {
    let scores: Vec<f64> = repositories::attempts::list_scores_by_quiz(&mut *conn, quiz_id)
        .await?
        .into_iter()
        .map(|row| row.score)
        .collect();
    Ok(scoring::summary_statistics(&scores))
}

fn group_options(options: Vec<QuestionOption>) -> HashMap<String, Vec<QuestionOption>> {
    let mut grouped: HashMap<String, Vec<QuestionOption>> = HashMap::new();
    for option in options {
        grouped.entry(option.question_id.clone()).or_default().push(option);
    }
    grouped
}

fn answer_options(options: &[QuestionOption]) -> Vec<AnswerOption> {
    options
        .iter()
        .map(|option| AnswerOption { text: option.text.clone(), is_correct: option.is_correct })
        .collect()
}

/// Puts bank questions back into frozen order. Questions deleted from the bank
/// since the attempt started are dropped.
fn arrange_paper(
    order: &[String],
    questions: Vec<Question>,
    options: Vec<QuestionOption>,
) -> Vec<PaperQuestion> {
    let mut by_id: HashMap<String, Question> =
        questions.into_iter().map(|question| (question.id.clone(), question)).collect();
    let mut options = group_options(options);

    order
        .iter()
        .filter_map(|question_id| {
            let question = by_id.remove(question_id)?;
            let options = options.remove(question_id).unwrap_or_default();
            Some(PaperQuestion { question, options })
        })
        .collect()
}

fn gradable_paper(rows: Vec<PaperRow>, options: Vec<QuestionOption>) -> Vec<GradableQuestion> {
    let options = group_options(options);

    rows.into_iter()
        .map(|row| {
            let kind = row.question_type.parse::<QuestionType>().ok();
            let options = options.get(&row.question_id).map(Vec::as_slice).unwrap_or_default();
            GradableQuestion {
                kind,
                correct_answer: row.correct_answer,
                options: answer_options(options),
                mark: row.mark,
                question_id: row.question_id,
            }
        })
        .collect()
}

fn review_answers(rows: Vec<AnswerReviewRow>, options: Vec<QuestionOption>) -> Vec<ReviewedAnswer> {
    let options = group_options(options);

    rows.into_iter()
        .map(|row| {
            let kind = row.question_type.parse::<QuestionType>().ok();
            let options = options.get(&row.question_id).map(Vec::as_slice).unwrap_or_default();
            let correct_answer =
                grading::expected_answer(kind, row.correct_answer.as_deref(), &answer_options(options));
            ReviewedAnswer {
                question_id: row.question_id,
                question_text: row.question_text,
                correct_answer,
                given_answer: row.given_answer,
                is_correct: row.is_correct,
                marks_awarded: row.marks_awarded,
                feedback: row.feedback,
            }
        })
        .collect()
}
