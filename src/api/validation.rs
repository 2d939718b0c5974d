use std::collections::HashMap;

use crate::api::errors::ApiError;
use crate::core::config::QuizSettings;

pub(crate) const MAX_IDENTIFIER_LEN: usize = 128;

/// Path identifiers come from external systems; only their shape is checked.
pub(crate) fn validate_identifier(field: &str, value: &str) -> Result<(), ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.len() != value.len() {
        return Err(ApiError::BadRequest(format!("Invalid {field}")));
    }
    if value.len() > MAX_IDENTIFIER_LEN {
        return Err(ApiError::BadRequest(format!(
            "{field} must be at most {MAX_IDENTIFIER_LEN} characters long"
        )));
    }
    if value.chars().any(char::is_control) {
        return Err(ApiError::BadRequest(format!("Invalid {field}")));
    }
    Ok(())
}

pub(crate) fn validate_submission(
    answers: &HashMap<String, String>,
    limits: &QuizSettings,
) -> Result<(), ApiError> {
    if answers.len() as u64 > limits.max_answers_per_submission {
        return Err(ApiError::BadRequest(format!(
            "At most {} answers can be submitted at once",
            limits.max_answers_per_submission
        )));
    }

    for (question_id, answer) in answers {
        if question_id.trim().is_empty() {
            return Err(ApiError::BadRequest("Answer keys must be question ids".to_string()));
        }
        if answer.chars().count() as u64 > limits.max_answer_length {
            return Err(ApiError::BadRequest(format!(
                "Answer for question {question_id} exceeds {} characters",
                limits.max_answer_length
            )));
        }
    }

    Ok(())
}
