use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use std::num;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("questionnaire not found(id: {0})")]
    QuestionnaireNotFound(i32),

    #[error("questionnaire has no questions(id: {0})")]
    QuestionsNotFound(i32),

    #[error("questionnaire is not available now(id: {0})")]
    QuestionnaireNotAvailable(i32),

    #[error("submission limit exceeded(questionnaire: {questionnaire_id}, limit: {limit})")]
    SubmissionLimitExceeded { questionnaire_id: i32, limit: i32 },

    #[error("another submission is still in progress(id: {0})")]
    SubmissionInProgress(i32),

    #[error("submission not found or not in progress(id: {0})")]
    SubmissionNotInProgress(i32),

    #[error("submission not found(id: {0})")]
    SubmissionNotFound(i32),

    #[error("answer time of questionnaire has expired(submission: {0})")]
    QuestionnaireExpired(i32),

    #[error("question does not match the current one of submission(expected: {expected:?}, got: {got})")]
    SubmissionQuestionMismatch { expected: Option<i32>, got: i32 },

    #[error("questionnaire does not allow going back(submission: {0})")]
    BackNotAllowed(i32),

    #[error("no more questions(submission: {0})")]
    NoMoreQuestions(i32),

    #[error("already at the first question(submission: {0})")]
    NoPreviousQuestion(i32),

    #[error("invalid answer: {0}")]
    InvalidAnswer(String),

    #[error("invalid questionnaire: {0}")]
    InvalidQuestionnaire(String),

    #[error("questionnaire already has submissions(id: {0})")]
    QuestionnaireLocked(i32),

    #[error("no permission")]
    Forbidden,

    #[error("unauthorized")]
    Unauthorized,

    #[error("storage failure: {0}")]
    StorageFailure(#[from] sqlx::Error),

    #[error("jwt error: {0}")]
    JWTError(#[from] jsonwebtoken::errors::Error),

    #[error("config error: {0}")]
    ConfigError(String),

    #[error("dotenv error: {0}")]
    DotEnvError(#[from] dotenv::Error),

    #[error("parse int error: {0}")]
    ParseIntError(#[from] num::ParseIntError),
}

impl Error {
    /// Outcomes a well-behaved client runs into during normal use, as opposed
    /// to failures of the service itself.
    pub fn is_expected(&self) -> bool {
        !matches!(self, Error::StorageFailure(_) | Error::ConfigError(_) | Error::DotEnvError(_) | Error::ParseIntError(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Error::QuestionnaireNotFound(_) => "questionnaire_not_found",
            Error::QuestionsNotFound(_) => "questions_not_found",
            Error::QuestionnaireNotAvailable(_) => "questionnaire_not_available",
            Error::SubmissionLimitExceeded { .. } => "submission_limit_exceeded",
            Error::SubmissionInProgress(_) => "submission_in_progress",
            Error::SubmissionNotInProgress(_) => "submission_not_in_progress",
            Error::SubmissionNotFound(_) => "submission_not_found",
            Error::QuestionnaireExpired(_) => "questionnaire_expired",
            Error::SubmissionQuestionMismatch { .. } => "submission_question_mismatch",
            Error::BackNotAllowed(_) => "back_not_allowed",
            Error::NoMoreQuestions(_) => "no_more_questions",
            Error::NoPreviousQuestion(_) => "no_previous_question",
            Error::InvalidAnswer(_) => "invalid_answer",
            Error::InvalidQuestionnaire(_) => "invalid_questionnaire",
            Error::QuestionnaireLocked(_) => "questionnaire_locked",
            Error::Forbidden => "forbidden",
            Error::Unauthorized | Error::JWTError(_) => "unauthorized",
            Error::StorageFailure(_) => "storage_failure",
            Error::ConfigError(_) | Error::DotEnvError(_) | Error::ParseIntError(_) => "server_error",
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::QuestionnaireNotFound(_) | Error::QuestionsNotFound(_) | Error::SubmissionNotFound(_) => StatusCode::NOT_FOUND,
            Error::QuestionnaireNotAvailable(_) | Error::SubmissionLimitExceeded { .. } | Error::QuestionnaireExpired(_) | Error::BackNotAllowed(_) | Error::Forbidden => {
                StatusCode::FORBIDDEN
            }
            Error::SubmissionInProgress(_)
            | Error::SubmissionNotInProgress(_)
            | Error::SubmissionQuestionMismatch { .. }
            | Error::NoMoreQuestions(_)
            | Error::NoPreviousQuestion(_)
            | Error::QuestionnaireLocked(_) => StatusCode::CONFLICT,
            Error::InvalidAnswer(_) | Error::InvalidQuestionnaire(_) => StatusCode::BAD_REQUEST,
            Error::Unauthorized | Error::JWTError(_) => StatusCode::UNAUTHORIZED,
            Error::StorageFailure(_) | Error::ConfigError(_) | Error::DotEnvError(_) | Error::ParseIntError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.is_expected() {
            log::info!("request rejected: {}", self);
        } else {
            log::error!("request failed: {}", self);
        }
        let message = if self.is_expected() { self.to_string() } else { "internal server error".into() };
        HttpResponse::build(self.status_code()).json(ErrorBody { error: self.kind(), message })
    }
}
