use sqlx::{Postgres, QueryBuilder};
use time::PrimitiveDateTime;

use crate::db::models::Attempt;

pub(crate) const COLUMNS: &str =
    "id, quiz_id, learner_id, order_seed, started_at, submitted_at, score";

pub(crate) struct CreateAttempt<'a> {
    pub(crate) id: &'a str,
    pub(crate) quiz_id: &'a str,
    pub(crate) learner_id: &'a str,
    pub(crate) order_seed: i64,
    pub(crate) started_at: PrimitiveDateTime,
}

/// A frozen-paper entry joined with what grading needs.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct PaperRow {
    pub(crate) question_id: String,
    pub(crate) question_type: String,
    pub(crate) correct_answer: Option<String>,
    pub(crate) mark: Option<i32>,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ScoreRow {
    pub(crate) learner_id: String,
    pub(crate) score: f64,
}

/// Serializes attempt creation for one (quiz, learner) pair until the
/// surrounding transaction ends.
pub(crate) async fn acquire_quiz_learner_lock(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
    learner_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
        .bind(format!("attempt:{quiz_id}:{learner_id}"))
        .execute(executor)
        .await?;
    Ok(())
}

pub(crate) async fn find_by_quiz_and_learner(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
    learner_id: &str,
) -> Result<Option<Attempt>, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!(
        "SELECT {COLUMNS} FROM attempts WHERE quiz_id = $1 AND learner_id = $2"
    ))
    .bind(quiz_id)
    .bind(learner_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn find_for_update(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
    learner_id: &str,
) -> Result<Option<Attempt>, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!(
        "SELECT {COLUMNS} FROM attempts WHERE quiz_id = $1 AND learner_id = $2 FOR UPDATE"
    ))
    .bind(quiz_id)
    .bind(learner_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn list_by_learner(
    executor: impl sqlx::PgExecutor<'_>,
    learner_id: &str,
    quiz_ids: &[String],
) -> Result<Vec<Attempt>, sqlx::Error> {
    if quiz_ids.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_as::<_, Attempt>(&format!(
        "SELECT {COLUMNS} FROM attempts WHERE learner_id = $1 AND quiz_id = ANY($2)"
    ))
    .bind(learner_id)
    .bind(quiz_ids)
    .fetch_all(executor)
    .await
}

/// Returns `false` when another transaction already created the attempt.
pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    attempt: CreateAttempt<'_>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO attempts (id, quiz_id, learner_id, order_seed, started_at, score)
         VALUES ($1, $2, $3, $4, $5, 0)
         ON CONFLICT (quiz_id, learner_id) DO NOTHING",
    )
    .bind(attempt.id)
    .bind(attempt.quiz_id)
    .bind(attempt.learner_id)
    .bind(attempt.order_seed)
    .bind(attempt.started_at)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub(crate) async fn insert_order(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
    question_ids: &[String],
) -> Result<(), sqlx::Error> {
    if question_ids.is_empty() {
        return Ok(());
    }

    let mut builder = QueryBuilder::<Postgres>::new(
        "INSERT INTO attempt_questions (attempt_id, question_id, position) ",
    );
    builder.push_values(question_ids.iter().enumerate(), |mut row, (position, question_id)| {
        row.push_bind(attempt_id).push_bind(question_id).push_bind(position as i32);
    });

    builder.build().execute(executor).await?;
    Ok(())
}

pub(crate) async fn list_order(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT question_id FROM attempt_questions WHERE attempt_id = $1 ORDER BY position",
    )
    .bind(attempt_id)
    .fetch_all(executor)
    .await
}

/// Frozen paper in position order. A question no longer assigned to the quiz
/// comes back with a `NULL` mark.
pub(crate) async fn list_paper(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
    attempt_id: &str,
) -> Result<Vec<PaperRow>, sqlx::Error> {
    sqlx::query_as::<_, PaperRow>(
        "SELECT aq.question_id, q.question_type, q.correct_answer, qq.mark
         FROM attempt_questions aq
         JOIN questions q ON q.id = aq.question_id
         LEFT JOIN quiz_questions qq ON qq.quiz_id = $1 AND qq.question_id = aq.question_id
         WHERE aq.attempt_id = $2
         ORDER BY aq.position",
    )
    .bind(quiz_id)
    .bind(attempt_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn mark_submitted(
    executor: impl sqlx::PgExecutor<'_>,
    id: &str,
    submitted_at: PrimitiveDateTime,
    score: f64,
) -> Result<Attempt, sqlx::Error> {
    sqlx::query_as::<_, Attempt>(&format!(
        "UPDATE attempts SET submitted_at = $1, score = $2
         WHERE id = $3 AND submitted_at IS NULL
         RETURNING {COLUMNS}"
    ))
    .bind(submitted_at)
    .bind(score)
    .bind(id)
    .fetch_one(executor)
    .await
}

/// Scores of every attempt on a quiz in read order.
pub(crate) async fn list_scores_by_quiz(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
) -> Result<Vec<ScoreRow>, sqlx::Error> {
    sqlx::query_as::<_, ScoreRow>(
        "SELECT learner_id, score FROM attempts WHERE quiz_id = $1 ORDER BY started_at, id",
    )
    .bind(quiz_id)
    .fetch_all(executor)
    .await
}
