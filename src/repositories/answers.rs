use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::services::grading::GradedAnswer;

/// An answer record joined with its question, for the learner's review.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct AnswerReviewRow {
    pub(crate) question_id: String,
    pub(crate) question_text: String,
    pub(crate) question_type: String,
    pub(crate) correct_answer: Option<String>,
    pub(crate) feedback: Option<String>,
    pub(crate) given_answer: String,
    pub(crate) is_correct: bool,
    pub(crate) marks_awarded: i32,
}

pub(crate) async fn insert_many(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
    answers: &[GradedAnswer],
) -> Result<(), sqlx::Error> {
    if answers.is_empty() {
        return Ok(());
    }

    let mut builder = QueryBuilder::<Postgres>::new(
        "INSERT INTO answer_records \
         (id, attempt_id, question_id, given_answer, is_correct, marks_awarded) ",
    );
    builder.push_values(answers, |mut row, answer| {
        row.push_bind(Uuid::new_v4().to_string())
            .push_bind(attempt_id)
            .push_bind(&answer.question_id)
            .push_bind(&answer.given_answer)
            .push_bind(answer.is_correct)
            .push_bind(answer.marks_awarded);
    });

    builder.build().execute(executor).await?;
    Ok(())
}

/// Graded answers of one attempt in frozen-paper order.
pub(crate) async fn list_for_review(
    executor: impl sqlx::PgExecutor<'_>,
    attempt_id: &str,
) -> Result<Vec<AnswerReviewRow>, sqlx::Error> {
    sqlx::query_as::<_, AnswerReviewRow>(
        "SELECT a.question_id, q.question_text, q.question_type, q.correct_answer, q.feedback,
                a.given_answer, a.is_correct, a.marks_awarded
         FROM answer_records a
         JOIN questions q ON q.id = a.question_id
         LEFT JOIN attempt_questions aq
                ON aq.attempt_id = a.attempt_id AND aq.question_id = a.question_id
         WHERE a.attempt_id = $1
         ORDER BY aq.position NULLS LAST, a.id",
    )
    .bind(attempt_id)
    .fetch_all(executor)
    .await
}
