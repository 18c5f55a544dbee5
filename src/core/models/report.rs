use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct OptionCount {
    pub option_id: i32,
    pub text: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct QuestionResult {
    pub question_id: i32,
    pub index: i32,
    pub text: String,
    pub descriptive: bool,
    pub answered: i64,
    pub options: Vec<OptionCount>,
    pub texts: Vec<String>,
}
