use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// What the user answered: free text for descriptive questions, one option
/// otherwise.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnswerValue {
    Text(String),
    OptionId(i32),
}

#[derive(Debug, Clone, Serialize, FromRow, PartialEq, Eq)]
pub struct Answer {
    pub id: i32,
    pub question_id: i32,
    pub user_id: i32,
    pub submission_id: i32,
    pub descriptive: bool,
    pub text: Option<String>,
    pub option_id: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct Upsert {
    pub question_id: i32,
    pub user_id: i32,
    pub submission_id: i32,
    pub descriptive: bool,
    pub text: Option<String>,
    pub option_id: Option<i32>,
}

impl Upsert {
    pub fn new(question_id: i32, user_id: i32, submission_id: i32, value: AnswerValue) -> Self {
        let (descriptive, text, option_id) = match value {
            AnswerValue::Text(text) => (true, Some(text), None),
            AnswerValue::OptionId(id) => (false, None, Some(id)),
        };
        Self {
            question_id,
            user_id,
            submission_id,
            descriptive,
            text,
            option_id,
        }
    }
}

#[derive(Debug, Default)]
pub struct Query {
    pub submission_id_eq: Option<i32>,
    pub questionnaire_id_eq: Option<i32>,
}
