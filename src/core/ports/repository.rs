use crate::core::models::{
    answer::{Answer, Query as AnswerQuery, Upsert as AnswerUpsert},
    option::Insert as OptionInsert,
    question::{Insert as QuestionInsert, Question},
    questionnaire::{Insert as QuestionnaireInsert, Patch as QuestionnairePatch, Policy, Questionnaire},
    submission::{Insert as SubmissionInsert, Query as SubmissionQuery, UserSubmission},
};
use crate::error::Error;

pub trait QuestionnaireCommon {
    async fn insert(&mut self, data: QuestionnaireInsert) -> Result<i32, Error>;
    async fn get(&mut self, id: i32) -> Result<Option<Questionnaire>, Error>;
    async fn get_for_update(&mut self, id: i32) -> Result<Option<Questionnaire>, Error>;
    async fn policy(&mut self, id: i32) -> Result<Option<Policy>, Error>;
    async fn patch(&mut self, id: i32, patch: &QuestionnairePatch) -> Result<(), Error>;
    async fn delete(&mut self, id: i32) -> Result<(), Error>;
    async fn increase_participation(&mut self, id: i32) -> Result<(), Error>;
}

pub trait QuestionCommon {
    async fn insert(&mut self, question: QuestionInsert) -> Result<i32, Error>;
    async fn set_correct_option(&mut self, id: i32, option_id: i32) -> Result<(), Error>;
    /// Questions of a questionnaire with their options, index ascending.
    async fn list_ordered(&mut self, questionnaire_id: i32) -> Result<Vec<Question>, Error>;
}

pub trait OptionCommon {
    async fn insert(&mut self, option: OptionInsert) -> Result<i32, Error>;
}

pub trait SubmissionCommon {
    async fn insert(&mut self, data: SubmissionInsert) -> Result<i32, Error>;
    async fn get(&mut self, id: i32) -> Result<Option<UserSubmission>, Error>;
    async fn get_for_update(&mut self, id: i32) -> Result<Option<UserSubmission>, Error>;
    async fn in_progress_for_update(&mut self, user_id: i32, questionnaire_id: i32) -> Result<Option<UserSubmission>, Error>;
    async fn count(&mut self, query: &SubmissionQuery) -> Result<i64, Error>;
    /// Serializes starts of the same user on the same questionnaire until the
    /// surrounding transaction ends.
    async fn lock_attempts(&mut self, user_id: i32, questionnaire_id: i32) -> Result<(), Error>;
    /// Writes status, cursor and update time of the whole row.
    async fn update(&mut self, submission: &UserSubmission) -> Result<(), Error>;
}

pub trait AnswerCommon {
    /// Inserts or replaces the answer keyed by (question, submission) and
    /// returns its id.
    async fn upsert(&mut self, answer: AnswerUpsert) -> Result<i32, Error>;
    async fn query(&mut self, query: &AnswerQuery) -> Result<Vec<Answer>, Error>;
}

pub trait Common: QuestionnaireCommon + QuestionCommon + OptionCommon + SubmissionCommon + AnswerCommon {}

pub trait Store: Common {}

pub trait TxStore: Store {
    async fn commit(self) -> Result<(), Error>;
    async fn rollback(self) -> Result<(), Error>;
}

pub trait Manager {
    type Store: Store;
    type Tx: TxStore;
    async fn db(&self) -> Result<Self::Store, Error>;
    async fn tx(&self) -> Result<Self::Tx, Error>;
}
