use crate::core::models::question::QuestionView;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

#[derive(sqlx::Type)]
#[sqlx(type_name = "submission_status", rename_all = "snake_case")]
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    #[default]
    InProgress,
    Done,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, FromRow, PartialEq, Eq)]
pub struct UserSubmission {
    pub id: i32,
    pub user_id: i32,
    pub questionnaire_id: i32,
    pub status: SubmissionStatus,
    pub current_question_index: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserSubmission {
    pub fn is_in_progress(&self) -> bool {
        self.status == SubmissionStatus::InProgress
    }
}

#[derive(Debug, Clone)]
pub struct Insert {
    pub user_id: i32,
    pub questionnaire_id: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct Query {
    pub user_id_eq: Option<i32>,
    pub questionnaire_id_eq: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct Started {
    pub submission_id: i32,
    pub question: QuestionView,
}
