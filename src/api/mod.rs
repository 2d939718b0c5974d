pub(crate) mod errors;
pub(crate) mod handlers;
mod learners;
mod quizzes;
pub(crate) mod router;
mod validation;
