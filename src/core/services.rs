pub mod questionnaire;
pub mod report;
pub mod submission;
