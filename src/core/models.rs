pub mod answer;
pub mod common;
pub mod option;
pub mod question;
pub mod questionnaire;
pub mod report;
pub mod submission;
