pub(crate) mod attempts;
pub(crate) mod grading;
pub(crate) mod learner_quizzes;
pub(crate) mod ordering;
pub(crate) mod quiz_status;
pub(crate) mod scoring;
