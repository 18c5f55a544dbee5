use crate::core::models::option::{Opt, OptCreate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Question {
    pub id: i32,
    pub questionnaire_id: i32,
    pub index: i32,
    pub text: String,
    pub descriptive: bool,
    pub correct_option_id: Option<i32>,
    pub options: Vec<Opt>,
}

impl Question {
    pub fn has_option(&self, option_id: i32) -> bool {
        self.options.iter().any(|o| o.id == option_id)
    }
}

/// A question as shown to someone answering it, without the answer key.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct QuestionView {
    pub id: i32,
    pub questionnaire_id: i32,
    pub index: i32,
    pub text: String,
    pub descriptive: bool,
    pub options: Vec<Opt>,
}

impl From<Question> for QuestionView {
    fn from(q: Question) -> Self {
        Self {
            id: q.id,
            questionnaire_id: q.questionnaire_id,
            index: q.index,
            text: q.text,
            descriptive: q.descriptive,
            options: q.options,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct QuestionCreate {
    pub text: String,
    #[serde(default)]
    pub descriptive: bool,
    #[serde(default)]
    pub options: Vec<OptCreate>,
    /// Position of the correct option in `options`.
    #[serde(default)]
    pub correct_option: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct Insert {
    pub questionnaire_id: i32,
    pub index: i32,
    pub text: String,
    pub descriptive: bool,
}
