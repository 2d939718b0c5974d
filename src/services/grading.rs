//! Per-question grading rules.
//!
//! Grading walks the attempt's frozen order, never the submitted map, so only
//! the questions on the learner's paper can earn or cost marks. A question the
//! learner left unanswered is skipped: it adds nothing to the raw score, nothing
//! to the maximum, and produces no answer record.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::db::types::QuestionType;

pub(crate) const DEFAULT_MARK: i32 = 1;

#[derive(Debug, Clone)]
pub(crate) struct AnswerOption {
    pub(crate) text: String,
    pub(crate) is_correct: bool,
}

/// One entry of the frozen paper with everything needed to grade it.
#[derive(Debug, Clone)]
pub(crate) struct GradableQuestion {
    pub(crate) question_id: String,
    /// `None` when the stored type is not one the grader knows.
    pub(crate) kind: Option<QuestionType>,
    pub(crate) correct_answer: Option<String>,
    /// Authoring order.
    pub(crate) options: Vec<AnswerOption>,
    pub(crate) mark: Option<i32>,
}

impl GradableQuestion {
    pub(crate) fn weight(&self) -> i32 {
        self.mark.unwrap_or(DEFAULT_MARK)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct GradedAnswer {
    pub(crate) question_id: String,
    pub(crate) given_answer: String,
    pub(crate) is_correct: bool,
    pub(crate) marks_awarded: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct GradeOutcome {
    pub(crate) answers: Vec<GradedAnswer>,
    pub(crate) raw_score: i64,
    pub(crate) max_raw_score: i64,
}

pub(crate) fn grade(paper: &[GradableQuestion], answers: &HashMap<String, String>) -> GradeOutcome {
    let mut outcome = GradeOutcome::default();

    for question in paper {
        let Some(given) = answers.get(&question.question_id) else {
            continue;
        };

        let weight = question.weight();
        outcome.max_raw_score += i64::from(weight);

        let is_correct = is_correct(question, given);
        let marks_awarded = if is_correct { weight } else { 0 };
        outcome.raw_score += i64::from(marks_awarded);

        outcome.answers.push(GradedAnswer {
            question_id: question.question_id.clone(),
            given_answer: given.clone(),
            is_correct,
            marks_awarded,
        });
    }

    outcome
}

pub(crate) fn is_correct(question: &GradableQuestion, given: &str) -> bool {
    match question.kind {
        Some(QuestionType::FillBlank) => {
            fill_blank_matches(question.correct_answer.as_deref(), given)
        }
        Some(QuestionType::TrueFalse) => {
            normalize(given) == normalize(question.correct_answer.as_deref().unwrap_or(""))
        }
        Some(QuestionType::MultiSelect) => multi_select_matches(&question.options, given),
        Some(QuestionType::Mcq) => mcq_matches(&question.options, given),
        None => {
            tracing::warn!(
                question_id = %question.question_id,
                "Question has an unsupported type; grading it as incorrect"
            );
            false
        }
    }
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Accepts a JSON array of strings. Anything else yields `None`.
pub(crate) fn parse_string_list(raw: &str) -> Option<Vec<String>> {
    serde_json::from_str::<Vec<String>>(raw).ok()
}

fn fill_blank_matches(payload: Option<&str>, given: &str) -> bool {
    let accepted = payload.and_then(parse_string_list).unwrap_or_default();
    let given = normalize(given);
    // Only the learner's input is trimmed; accepted entries match as stored.
    accepted.iter().any(|candidate| candidate.to_lowercase() == given)
}

fn multi_select_matches(options: &[AnswerOption], given: &str) -> bool {
    let selected: HashSet<String> = parse_string_list(given).unwrap_or_default().into_iter().collect();
    let correct: HashSet<String> = options
        .iter()
        .filter(|option| option.is_correct)
        .map(|option| option.text.clone())
        .collect();
    selected == correct
}

fn mcq_matches(options: &[AnswerOption], given: &str) -> bool {
    options.iter().find(|option| option.is_correct).is_some_and(|option| option.text == given)
}

/// What the summary shows as the expected answer for a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub(crate) enum CorrectAnswer {
    Single(String),
    Many(Vec<String>),
}

pub(crate) fn expected_answer(
    kind: Option<QuestionType>,
    payload: Option<&str>,
    options: &[AnswerOption],
) -> Option<CorrectAnswer> {
    let correct_texts =
        || options.iter().filter(|option| option.is_correct).map(|option| option.text.clone());

    match kind? {
        QuestionType::Mcq => correct_texts().next().map(CorrectAnswer::Single),
        QuestionType::MultiSelect => Some(CorrectAnswer::Many(correct_texts().collect())),
        QuestionType::TrueFalse => payload.map(|value| CorrectAnswer::Single(value.to_string())),
        QuestionType::FillBlank => {
            let accepted = payload.and_then(parse_string_list).unwrap_or_default();
            Some(CorrectAnswer::Single(accepted.join(", ")))
        }
    }
}
