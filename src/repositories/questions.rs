use crate::db::models::{Question, QuestionOption};

pub(crate) const COLUMNS: &str =
    "id, question_text, question_type, correct_answer, feedback, created_at";

pub(crate) const OPTION_COLUMNS: &str = "id, question_id, text, is_correct, order_index";

pub(crate) async fn list_by_ids(
    executor: impl sqlx::PgExecutor<'_>,
    ids: &[String],
) -> Result<Vec<Question>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_as::<_, Question>(&format!("SELECT {COLUMNS} FROM questions WHERE id = ANY($1)"))
        .bind(ids)
        .fetch_all(executor)
        .await
}

pub(crate) async fn list_existing_ids(
    executor: impl sqlx::PgExecutor<'_>,
    ids: &[String],
) -> Result<Vec<String>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_scalar("SELECT id FROM questions WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(executor)
        .await
}

/// Options of several questions, each question's options in authoring order.
pub(crate) async fn list_options_by_questions(
    executor: impl sqlx::PgExecutor<'_>,
    question_ids: &[String],
) -> Result<Vec<QuestionOption>, sqlx::Error> {
    if question_ids.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_as::<_, QuestionOption>(&format!(
        "SELECT {OPTION_COLUMNS} FROM question_options
         WHERE question_id = ANY($1)
         ORDER BY question_id, order_index, id"
    ))
    .bind(question_ids)
    .fetch_all(executor)
    .await
}
