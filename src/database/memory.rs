//! In-process implementation of the repository ports for tests. A store holds
//! the whole state locked for its lifetime and works on a staged copy, so
//! `commit` publishes the copy and dropping or rolling back discards it.

use crate::core::models::{
    answer::{Answer, Query as AnswerQuery, Upsert as AnswerUpsert},
    option::{Insert as OptionInsert, Opt},
    question::{Insert as QuestionInsert, Question},
    questionnaire::{Insert as QuestionnaireInsert, Patch as QuestionnairePatch, Policy, Questionnaire},
    submission::{Insert as SubmissionInsert, Query as SubmissionQuery, SubmissionStatus, UserSubmission},
};
use crate::core::ports::clock::Clock;
use crate::core::ports::repository::{AnswerCommon, Common, Manager, OptionCommon, QuestionCommon, QuestionnaireCommon, Store, SubmissionCommon, TxStore};
use crate::error::Error;
use chrono::{DateTime, Duration, TimeZone, Utc};
use log::{Level, Log, Metadata, Record};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Default, Clone)]
pub struct State {
    pub questionnaires: BTreeMap<i32, Questionnaire>,
    pub questions: BTreeMap<i32, Question>,
    pub submissions: BTreeMap<i32, UserSubmission>,
    pub answers: BTreeMap<i32, Answer>,
    last_id: i32,
}

impl State {
    fn next_id(&mut self) -> i32 {
        self.last_id += 1;
        self.last_id
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemManager {
    state: Arc<Mutex<State>>,
}

impl MemManager {
    pub async fn snapshot(&self) -> State {
        self.state.lock().await.clone()
    }

    async fn open(&self) -> MemStore {
        let guard = self.state.clone().lock_owned().await;
        let staged = (*guard).clone();
        MemStore { guard, staged }
    }
}

impl Manager for MemManager {
    type Store = MemStore;
    type Tx = MemStore;

    async fn db(&self) -> Result<MemStore, Error> {
        Ok(self.open().await)
    }

    async fn tx(&self) -> Result<MemStore, Error> {
        Ok(self.open().await)
    }
}

pub struct MemStore {
    guard: OwnedMutexGuard<State>,
    staged: State,
}

impl QuestionnaireCommon for MemStore {
    async fn insert(&mut self, data: QuestionnaireInsert) -> Result<i32, Error> {
        let id = self.staged.next_id();
        self.staged.questionnaires.insert(
            id,
            Questionnaire {
                id,
                owner_id: data.owner_id,
                title: data.title,
                created_at: data.created_at,
                start_time: data.start_time,
                end_time: data.end_time,
                random: data.random,
                back_compatible: data.back_compatible,
                answer_time_secs: data.answer_time_secs,
                anonymous: data.anonymous,
                submit_limit: data.submit_limit,
                participation_count: 0,
            },
        );
        Ok(id)
    }

    async fn get(&mut self, id: i32) -> Result<Option<Questionnaire>, Error> {
        Ok(self.staged.questionnaires.get(&id).cloned())
    }

    async fn get_for_update(&mut self, id: i32) -> Result<Option<Questionnaire>, Error> {
        Ok(self.staged.questionnaires.get(&id).cloned())
    }

    async fn policy(&mut self, id: i32) -> Result<Option<Policy>, Error> {
        Ok(self.staged.questionnaires.get(&id).map(Questionnaire::policy))
    }

    async fn patch(&mut self, id: i32, patch: &QuestionnairePatch) -> Result<(), Error> {
        if let Some(q) = self.staged.questionnaires.get_mut(&id) {
            q.apply(patch.clone());
        }
        Ok(())
    }

    async fn delete(&mut self, id: i32) -> Result<(), Error> {
        let state = &mut self.staged;
        state.questionnaires.remove(&id);
        state.questions.retain(|_, q| q.questionnaire_id != id);
        state.submissions.retain(|_, s| s.questionnaire_id != id);
        let (questions, submissions) = (&state.questions, &state.submissions);
        state.answers.retain(|_, a| questions.contains_key(&a.question_id) && submissions.contains_key(&a.submission_id));
        Ok(())
    }

    async fn increase_participation(&mut self, id: i32) -> Result<(), Error> {
        if let Some(q) = self.staged.questionnaires.get_mut(&id) {
            q.participation_count += 1;
        }
        Ok(())
    }
}

impl QuestionCommon for MemStore {
    async fn insert(&mut self, question: QuestionInsert) -> Result<i32, Error> {
        if !self.staged.questionnaires.contains_key(&question.questionnaire_id) {
            return Err(Error::StorageFailure(sqlx::Error::RowNotFound));
        }
        let id = self.staged.next_id();
        self.staged.questions.insert(
            id,
            Question {
                id,
                questionnaire_id: question.questionnaire_id,
                index: question.index,
                text: question.text,
                descriptive: question.descriptive,
                correct_option_id: None,
                options: Vec::new(),
            },
        );
        Ok(id)
    }

    async fn set_correct_option(&mut self, id: i32, option_id: i32) -> Result<(), Error> {
        if let Some(q) = self.staged.questions.get_mut(&id) {
            q.correct_option_id = Some(option_id);
        }
        Ok(())
    }

    async fn list_ordered(&mut self, questionnaire_id: i32) -> Result<Vec<Question>, Error> {
        let mut questions: Vec<Question> = self.staged.questions.values().filter(|q| q.questionnaire_id == questionnaire_id).cloned().collect();
        questions.sort_by_key(|q| q.index);
        Ok(questions)
    }
}

impl OptionCommon for MemStore {
    async fn insert(&mut self, option: OptionInsert) -> Result<i32, Error> {
        let id = self.staged.next_id();
        let question = self.staged.questions.get_mut(&option.question_id).ok_or(Error::StorageFailure(sqlx::Error::RowNotFound))?;
        question.options.push(Opt {
            id,
            question_id: option.question_id,
            index: option.index,
            text: option.text,
        });
        question.options.sort_by_key(|o| o.index);
        Ok(id)
    }
}

impl SubmissionCommon for MemStore {
    async fn insert(&mut self, data: SubmissionInsert) -> Result<i32, Error> {
        let id = self.staged.next_id();
        self.staged.submissions.insert(
            id,
            UserSubmission {
                id,
                user_id: data.user_id,
                questionnaire_id: data.questionnaire_id,
                status: SubmissionStatus::InProgress,
                current_question_index: 0,
                created_at: data.created_at,
                updated_at: data.created_at,
            },
        );
        Ok(id)
    }

    async fn get(&mut self, id: i32) -> Result<Option<UserSubmission>, Error> {
        Ok(self.staged.submissions.get(&id).cloned())
    }

    async fn get_for_update(&mut self, id: i32) -> Result<Option<UserSubmission>, Error> {
        Ok(self.staged.submissions.get(&id).cloned())
    }

    async fn in_progress_for_update(&mut self, user_id: i32, questionnaire_id: i32) -> Result<Option<UserSubmission>, Error> {
        Ok(self
            .staged
            .submissions
            .values()
            .find(|s| s.user_id == user_id && s.questionnaire_id == questionnaire_id && s.is_in_progress())
            .cloned())
    }

    async fn count(&mut self, query: &SubmissionQuery) -> Result<i64, Error> {
        let n = self
            .staged
            .submissions
            .values()
            .filter(|s| query.user_id_eq.map_or(true, |v| s.user_id == v))
            .filter(|s| query.questionnaire_id_eq.map_or(true, |v| s.questionnaire_id == v))
            .count();
        Ok(n as i64)
    }

    async fn lock_attempts(&mut self, _user_id: i32, _questionnaire_id: i32) -> Result<(), Error> {
        Ok(())
    }

    async fn update(&mut self, submission: &UserSubmission) -> Result<(), Error> {
        if let Some(s) = self.staged.submissions.get_mut(&submission.id) {
            s.status = submission.status;
            s.current_question_index = submission.current_question_index;
            s.updated_at = submission.updated_at;
        }
        Ok(())
    }
}

impl AnswerCommon for MemStore {
    async fn upsert(&mut self, answer: AnswerUpsert) -> Result<i32, Error> {
        let existing = self
            .staged
            .answers
            .values_mut()
            .find(|a| a.question_id == answer.question_id && a.submission_id == answer.submission_id);
        if let Some(a) = existing {
            a.descriptive = answer.descriptive;
            a.text = answer.text;
            a.option_id = answer.option_id;
            return Ok(a.id);
        }
        let id = self.staged.next_id();
        self.staged.answers.insert(
            id,
            Answer {
                id,
                question_id: answer.question_id,
                user_id: answer.user_id,
                submission_id: answer.submission_id,
                descriptive: answer.descriptive,
                text: answer.text,
                option_id: answer.option_id,
            },
        );
        Ok(id)
    }

    async fn query(&mut self, query: &AnswerQuery) -> Result<Vec<Answer>, Error> {
        let questions = &self.staged.questions;
        let mut answers: Vec<Answer> = self
            .staged
            .answers
            .values()
            .filter(|a| query.submission_id_eq.map_or(true, |v| a.submission_id == v))
            .filter(|a| query.questionnaire_id_eq.map_or(true, |v| questions.get(&a.question_id).map_or(false, |q| q.questionnaire_id == v)))
            .cloned()
            .collect();
        answers.sort_by_key(|a| (questions.get(&a.question_id).map(|q| q.index), a.id));
        Ok(answers)
    }
}

impl Common for MemStore {}
impl Store for MemStore {}

impl TxStore for MemStore {
    async fn commit(self) -> Result<(), Error> {
        let MemStore { mut guard, staged } = self;
        *guard = staged;
        Ok(())
    }

    async fn rollback(self) -> Result<(), Error> {
        Ok(())
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct FixedClock(Arc<std::sync::Mutex<DateTime<Utc>>>);

impl Default for FixedClock {
    fn default() -> Self {
        Self(Arc::new(std::sync::Mutex::new(Utc.with_ymd_and_hms(2023, 6, 1, 9, 0, 0).unwrap())))
    }
}

impl FixedClock {
    pub fn advance(&self, by: Duration) {
        let mut now = self.0.lock().unwrap();
        *now = *now + by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

#[derive(Debug, Default)]
pub struct RecordingLog {
    records: std::sync::Mutex<Vec<(Level, String)>>,
}

impl RecordingLog {
    pub fn messages(&self) -> Vec<String> {
        self.records.lock().unwrap().iter().map(|(_, m)| m.clone()).collect()
    }
}

impl Log for RecordingLog {
    fn enabled(&self, _: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        self.records.lock().unwrap().push((record.level(), record.args().to_string()));
    }

    fn flush(&self) {}
}
