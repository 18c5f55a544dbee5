use crate::core::models::answer::AnswerValue;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct SubmissionRef {
    pub submission_id: i32,
}

#[derive(Debug, Deserialize)]
pub struct SubmitAnswer {
    pub submission_id: i32,
    pub question_id: i32,
    pub answer: AnswerValue,
}
