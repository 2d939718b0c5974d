use sqlx::{Postgres, QueryBuilder};
use time::PrimitiveDateTime;

use crate::db::models::Quiz;
use crate::db::types::QuizStatus;

pub(crate) const COLUMNS: &str = "\
    id, title, duration_minutes, total_marks, start_time, end_time, \
    is_active, status, random_order, created_at, updated_at";

pub(crate) struct CreateQuiz<'a> {
    pub(crate) id: &'a str,
    pub(crate) title: &'a str,
    pub(crate) duration_minutes: i32,
    pub(crate) total_marks: i32,
    pub(crate) start_time: PrimitiveDateTime,
    pub(crate) end_time: Option<PrimitiveDateTime>,
    pub(crate) is_active: bool,
    pub(crate) random_order: bool,
    pub(crate) now: PrimitiveDateTime,
}

pub(crate) struct AssignQuestion<'a> {
    pub(crate) question_id: &'a str,
    pub(crate) mark: i32,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    quiz: CreateQuiz<'_>,
) -> Result<Quiz, sqlx::Error> {
    sqlx::query_as::<_, Quiz>(&format!(
        "INSERT INTO quizzes (
            id, title, duration_minutes, total_marks, start_time, end_time,
            is_active, status, random_order, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$10)
        RETURNING {COLUMNS}"
    ))
    .bind(quiz.id)
    .bind(quiz.title)
    .bind(quiz.duration_minutes)
    .bind(quiz.total_marks)
    .bind(quiz.start_time)
    .bind(quiz.end_time)
    .bind(quiz.is_active)
    .bind(QuizStatus::Active)
    .bind(quiz.random_order)
    .bind(quiz.now)
    .fetch_one(executor)
    .await
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Quiz>, sqlx::Error> {
    sqlx::query_as::<_, Quiz>(&format!("SELECT {COLUMNS} FROM quizzes WHERE id = $1"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Instructor listing, newest first.
pub(crate) async fn list(
    executor: impl sqlx::PgExecutor<'_>,
    skip: i64,
    limit: i64,
) -> Result<Vec<Quiz>, sqlx::Error> {
    sqlx::query_as::<_, Quiz>(&format!(
        "SELECT {COLUMNS} FROM quizzes ORDER BY created_at DESC, id DESC OFFSET $1 LIMIT $2"
    ))
    .bind(skip.max(0))
    .bind(limit.clamp(1, 1000))
    .fetch_all(executor)
    .await
}

/// Row lock so concurrent toggles on one quiz serialize.
pub(crate) async fn find_for_update(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
) -> Result<Option<Quiz>, sqlx::Error> {
    sqlx::query_as::<_, Quiz>(&format!("SELECT {COLUMNS} FROM quizzes WHERE id = $1 FOR UPDATE"))
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Active-flag quizzes assigned to a learner, oldest start first.
pub(crate) async fn list_assigned_to_learner(
    executor: impl sqlx::PgExecutor<'_>,
    learner_id: &str,
) -> Result<Vec<Quiz>, sqlx::Error> {
    sqlx::query_as::<_, Quiz>(&format!(
        "SELECT {COLUMNS} FROM quizzes
         WHERE is_active = TRUE
           AND id IN (SELECT quiz_id FROM quiz_assignments WHERE learner_id = $1)
         ORDER BY start_time, id"
    ))
    .bind(learner_id)
    .fetch_all(executor)
    .await
}

/// Assigned question ids in assignment order.
pub(crate) async fn list_question_ids(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar("SELECT question_id FROM quiz_questions WHERE quiz_id = $1 ORDER BY id")
        .bind(quiz_id)
        .fetch_all(executor)
        .await
}

/// Appends assignments in the given order; questions already on the quiz are
/// left untouched. Returns how many rows were added.
pub(crate) async fn assign_questions(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
    questions: &[AssignQuestion<'_>],
) -> Result<u64, sqlx::Error> {
    if questions.is_empty() {
        return Ok(0);
    }

    let mut builder =
        QueryBuilder::<Postgres>::new("INSERT INTO quiz_questions (quiz_id, question_id, mark) ");
    builder.push_values(questions, |mut row, question| {
        row.push_bind(quiz_id).push_bind(question.question_id).push_bind(question.mark);
    });
    builder.push(" ON CONFLICT (quiz_id, question_id) DO NOTHING");

    let result = builder.build().execute(executor).await?;
    Ok(result.rows_affected())
}

pub(crate) async fn complete_if_active(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    now: PrimitiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("UPDATE quizzes SET status = $1, updated_at = $2 WHERE id = $3 AND status = $4")
            .bind(QuizStatus::Completed)
            .bind(now)
            .bind(id)
            .bind(QuizStatus::Active)
            .execute(executor)
            .await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn update_status(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    status: QuizStatus,
    now: PrimitiveDateTime,
) -> Result<Quiz, sqlx::Error> {
    sqlx::query_as::<_, Quiz>(&format!(
        "UPDATE quizzes SET status = $1, updated_at = $2 WHERE id = $3 RETURNING {COLUMNS}"
    ))
    .bind(status)
    .bind(now)
    .bind(id)
    .fetch_one(executor)
    .await
}

pub(crate) async fn update_active(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    is_active: bool,
    now: PrimitiveDateTime,
) -> Result<Quiz, sqlx::Error> {
    sqlx::query_as::<_, Quiz>(&format!(
        "UPDATE quizzes SET is_active = $1, updated_at = $2 WHERE id = $3 RETURNING {COLUMNS}"
    ))
    .bind(is_active)
    .bind(now)
    .bind(id)
    .fetch_one(executor)
    .await
}
