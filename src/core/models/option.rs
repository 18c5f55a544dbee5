use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Opt {
    pub id: i32,
    pub question_id: i32,
    pub index: i32,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct OptCreate {
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct Insert {
    pub question_id: i32,
    pub index: i32,
    pub text: String,
}
