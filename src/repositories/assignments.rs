use sqlx::{Postgres, QueryBuilder};
use time::PrimitiveDateTime;

/// Idempotent: learners already assigned are skipped. Returns the number of
/// new assignments.
pub(crate) async fn assign_learners(
    executor: impl sqlx::PgExecutor<'_>,
    quiz_id: &str,
    learner_ids: &[String],
    now: PrimitiveDateTime,
) -> Result<u64, sqlx::Error> {
    if learner_ids.is_empty() {
        return Ok(0);
    }

    let mut builder = QueryBuilder::<Postgres>::new(
        "INSERT INTO quiz_assignments (quiz_id, learner_id, assigned_at) ",
    );
    builder.push_values(learner_ids, |mut row, learner_id| {
        row.push_bind(quiz_id).push_bind(learner_id).push_bind(now);
    });
    builder.push(" ON CONFLICT (quiz_id, learner_id) DO NOTHING");

    let result = builder.build().execute(executor).await?;
    Ok(result.rows_affected())
}
