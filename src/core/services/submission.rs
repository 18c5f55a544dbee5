//! The attempt state machine. A submission is created `InProgress` by
//! [`SubmissionEngine::start`], walked with `next`/`back`, answered with
//! `submit` and closed by `end` or by running out of answer time.
//!
//! Every operation runs in its own transaction taken from the manager and the
//! engine keeps nothing between calls.

use crate::core::models::{
    answer::{AnswerValue, Upsert as AnswerUpsert},
    common::Ctx,
    question::{Question, QuestionView},
    questionnaire::Policy,
    submission::{Insert as SubmissionInsert, Query as SubmissionQuery, Started, SubmissionStatus, UserSubmission},
};
use crate::core::ports::clock::Clock;
use crate::core::ports::repository::{AnswerCommon, Manager, QuestionCommon, QuestionnaireCommon, Store, SubmissionCommon, TxStore};
use crate::error::Error;
use chrono::{DateTime, Utc};
use log::{Level, Log, Record};
use std::fmt;
use std::sync::Arc;

const LOG_TARGET: &str = "submission";

enum Step<T> {
    Continue(T),
    // submission was closed for running out of time, the close must be committed
    Expired(i32),
}

pub struct SubmissionEngine<M, C> {
    manager: M,
    clock: C,
    logger: Arc<dyn Log>,
}

impl<M, C> SubmissionEngine<M, C>
where
    M: Manager,
    C: Clock,
{
    pub fn new(manager: M, clock: C, logger: Arc<dyn Log>) -> Self {
        Self { manager, clock, logger }
    }

    pub async fn policy(&self, questionnaire_id: i32) -> Result<Policy, Error> {
        let mut store = self.manager.db().await?;
        policy_of(&mut store, questionnaire_id).await
    }

    /// Opens a new attempt and returns it together with the first question.
    ///
    /// When the questionnaire has no questions the attempt is still persisted
    /// and `QuestionsNotFound` is returned.
    pub async fn start(&self, ctx: &Ctx, uid: i32, questionnaire_id: i32) -> Result<Started, Error> {
        let mut tx = self.manager.tx().await?;
        let res = self.start_in(ctx, &mut tx, uid, questionnaire_id).await;
        let (submission_id, questions) = self.settle(ctx, tx, res).await?;
        match questions.into_iter().next() {
            Some(question) => {
                self.log(
                    Level::Info,
                    format_args!("[{}] user {} started submission {} of questionnaire {}", ctx, uid, submission_id, questionnaire_id),
                );
                Ok(Started {
                    submission_id,
                    question: question.into(),
                })
            }
            None => {
                self.log(
                    Level::Warn,
                    format_args!("[{}] submission {} started on questionnaire {} which has no questions", ctx, submission_id, questionnaire_id),
                );
                Err(Error::QuestionsNotFound(questionnaire_id))
            }
        }
    }

    async fn start_in<S: Store>(&self, ctx: &Ctx, store: &mut S, uid: i32, questionnaire_id: i32) -> Result<Step<(i32, Vec<Question>)>, Error> {
        let policy = policy_of(store, questionnaire_id).await?;
        let now = self.clock.now();
        if !policy.is_available(now) {
            return Err(Error::QuestionnaireNotAvailable(questionnaire_id));
        }
        SubmissionCommon::lock_attempts(store, uid, questionnaire_id).await?;
        if policy.submit_limit > 0 {
            let attempts = SubmissionCommon::count(
                store,
                &SubmissionQuery {
                    user_id_eq: Some(uid),
                    questionnaire_id_eq: Some(questionnaire_id),
                    ..default::default()
                },
            )
            .await?;
            if attempts >= i64::from(policy.submit_limit) {
                return Err(Error::SubmissionLimitExceeded {
                    questionnaire_id,
                    limit: policy.submit_limit,
                });
            }
        }
        if let Some(mut active) = SubmissionCommon::in_progress_for_update(store, uid, questionnaire_id).await? {
            if !policy.is_expired(active.created_at, now) {
                return Err(Error::SubmissionInProgress(active.id));
            }
            terminate(store, &mut active, now).await?;
            self.log(Level::Info, format_args!("[{}] submission {} ran out of time and was closed before a restart", ctx, active.id));
        }
        let submission_id = SubmissionCommon::insert(
            store,
            SubmissionInsert {
                user_id: uid,
                questionnaire_id,
                created_at: now,
            },
        )
        .await?;
        QuestionnaireCommon::increase_participation(store, questionnaire_id).await?;
        let questions = QuestionCommon::list_ordered(store, questionnaire_id).await?;
        Ok(Step::Continue((submission_id, questions)))
    }

    /// Records the answer to the question under the cursor. Answering the
    /// same question again replaces the earlier answer; the cursor never moves.
    pub async fn submit(&self, ctx: &Ctx, uid: i32, submission_id: i32, question_id: i32, value: AnswerValue) -> Result<i32, Error> {
        let mut tx = self.manager.tx().await?;
        let res = self.submit_in(&mut tx, uid, submission_id, question_id, value).await;
        let answer_id = self.settle(ctx, tx, res).await?;
        self.log(
            Level::Debug,
            format_args!("[{}] answer {} recorded for question {} of submission {}", ctx, answer_id, question_id, submission_id),
        );
        Ok(answer_id)
    }

    async fn submit_in<S: Store>(&self, store: &mut S, uid: i32, submission_id: i32, question_id: i32, value: AnswerValue) -> Result<Step<i32>, Error> {
        let mut submission = active_submission(store, uid, submission_id).await?;
        let now = self.clock.now();
        if let Step::Expired(id) = policy_unless_expired(store, &mut submission, now).await? {
            return Ok(Step::Expired(id));
        }
        let questions = QuestionCommon::list_ordered(store, submission.questionnaire_id).await?;
        let current = usize::try_from(submission.current_question_index).ok().and_then(|i| questions.get(i));
        let question = match current {
            Some(q) if q.id == question_id => q,
            _ => {
                return Err(Error::SubmissionQuestionMismatch {
                    expected: current.map(|q| q.id),
                    got: question_id,
                })
            }
        };
        check_answer(question, &value)?;
        let answer_id = AnswerCommon::upsert(store, AnswerUpsert::new(question_id, uid, submission_id, value)).await?;
        submission.updated_at = now;
        SubmissionCommon::update(store, &submission).await?;
        Ok(Step::Continue(answer_id))
    }

    /// Moves the cursor forward. An attempt past its answer time is closed
    /// instead, as with `submit`.
    pub async fn next(&self, ctx: &Ctx, uid: i32, submission_id: i32) -> Result<QuestionView, Error> {
        let mut tx = self.manager.tx().await?;
        let res = self.next_in(&mut tx, uid, submission_id).await;
        let question = self.settle(ctx, tx, res).await?;
        self.log(Level::Debug, format_args!("[{}] submission {} moved forward to question {}", ctx, submission_id, question.index));
        Ok(question.into())
    }

    async fn next_in<S: Store>(&self, store: &mut S, uid: i32, submission_id: i32) -> Result<Step<Question>, Error> {
        let mut submission = active_submission(store, uid, submission_id).await?;
        if let Step::Expired(id) = policy_unless_expired(store, &mut submission, self.clock.now()).await? {
            return Ok(Step::Expired(id));
        }
        let questions = QuestionCommon::list_ordered(store, submission.questionnaire_id).await?;
        let next = submission.current_question_index + 1;
        let question = usize::try_from(next)
            .ok()
            .and_then(|i| questions.into_iter().nth(i))
            .ok_or(Error::NoMoreQuestions(submission_id))?;
        self.move_cursor(store, &mut submission, next).await?;
        Ok(Step::Continue(question))
    }

    pub async fn back(&self, ctx: &Ctx, uid: i32, submission_id: i32) -> Result<QuestionView, Error> {
        let mut tx = self.manager.tx().await?;
        let res = self.back_in(&mut tx, uid, submission_id).await;
        let question = self.settle(ctx, tx, res).await?;
        self.log(Level::Debug, format_args!("[{}] submission {} moved back to question {}", ctx, submission_id, question.index));
        Ok(question.into())
    }

    async fn back_in<S: Store>(&self, store: &mut S, uid: i32, submission_id: i32) -> Result<Step<Question>, Error> {
        let mut submission = active_submission(store, uid, submission_id).await?;
        let policy = match policy_unless_expired(store, &mut submission, self.clock.now()).await? {
            Step::Continue(policy) => policy,
            Step::Expired(id) => return Ok(Step::Expired(id)),
        };
        if !policy.back_compatible {
            return Err(Error::BackNotAllowed(submission_id));
        }
        if submission.current_question_index <= 0 {
            return Err(Error::NoPreviousQuestion(submission_id));
        }
        let questions = QuestionCommon::list_ordered(store, submission.questionnaire_id).await?;
        let previous = submission.current_question_index - 1;
        let question = usize::try_from(previous)
            .ok()
            .and_then(|i| questions.into_iter().nth(i))
            .ok_or(Error::NoPreviousQuestion(submission_id))?;
        self.move_cursor(store, &mut submission, previous).await?;
        Ok(Step::Continue(question))
    }

    /// Closes the attempt wherever its cursor is. Answered-ness of the
    /// questions is not checked.
    pub async fn end(&self, ctx: &Ctx, uid: i32, submission_id: i32) -> Result<(), Error> {
        let mut tx = self.manager.tx().await?;
        let res = self.end_in(&mut tx, uid, submission_id).await;
        let cursor = self.settle(ctx, tx, res).await?;
        self.log(Level::Info, format_args!("[{}] submission {} ended at question {}", ctx, submission_id, cursor));
        Ok(())
    }

    async fn end_in<S: Store>(&self, store: &mut S, uid: i32, submission_id: i32) -> Result<Step<i32>, Error> {
        let mut submission = owned_submission(store, uid, submission_id).await?;
        terminate(store, &mut submission, self.clock.now()).await?;
        Ok(Step::Continue(submission.current_question_index))
    }

    /// Closes the attempt if it has run past the answer time and reports
    /// `QuestionnaireExpired` when it did so. Calling it again afterwards
    /// succeeds without touching the submission.
    pub async fn check_expire(&self, ctx: &Ctx, uid: i32, submission_id: i32) -> Result<(), Error> {
        let mut tx = self.manager.tx().await?;
        let res = self.check_expire_in(&mut tx, uid, submission_id).await;
        self.settle(ctx, tx, res).await
    }

    async fn check_expire_in<S: Store>(&self, store: &mut S, uid: i32, submission_id: i32) -> Result<Step<()>, Error> {
        let mut submission = owned_submission(store, uid, submission_id).await?;
        if !submission.is_in_progress() {
            return Ok(Step::Continue(()));
        }
        match policy_unless_expired(store, &mut submission, self.clock.now()).await? {
            Step::Continue(_) => Ok(Step::Continue(())),
            Step::Expired(id) => Ok(Step::Expired(id)),
        }
    }

    async fn move_cursor<S: Store>(&self, store: &mut S, submission: &mut UserSubmission, index: i32) -> Result<(), Error> {
        submission.current_question_index = index;
        submission.updated_at = self.clock.now();
        SubmissionCommon::update(store, submission).await
    }

    async fn settle<T, R>(&self, ctx: &Ctx, tx: T, res: Result<Step<R>, Error>) -> Result<R, Error>
    where
        T: TxStore,
    {
        match res {
            Ok(Step::Continue(r)) => {
                tx.commit().await?;
                Ok(r)
            }
            Ok(Step::Expired(submission_id)) => {
                tx.commit().await?;
                self.log(Level::Info, format_args!("[{}] submission {} expired and was closed", ctx, submission_id));
                Err(Error::QuestionnaireExpired(submission_id))
            }
            Err(e) => {
                if let Err(re) = tx.rollback().await {
                    self.log(Level::Error, format_args!("[{}] failed to roll back: {}", ctx, re));
                }
                Err(e)
            }
        }
    }

    fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        self.logger.log(&Record::builder().args(args).level(level).target(LOG_TARGET).build());
    }
}

async fn policy_of<S: Store>(store: &mut S, questionnaire_id: i32) -> Result<Policy, Error> {
    QuestionnaireCommon::policy(store, questionnaire_id)
        .await?
        .ok_or(Error::QuestionnaireNotFound(questionnaire_id))
}

// closes the submission when its answer time has run out
async fn policy_unless_expired<S: Store>(store: &mut S, submission: &mut UserSubmission, now: DateTime<Utc>) -> Result<Step<Policy>, Error> {
    let policy = policy_of(store, submission.questionnaire_id).await?;
    if policy.is_expired(submission.created_at, now) {
        terminate(store, submission, now).await?;
        return Ok(Step::Expired(submission.id));
    }
    Ok(Step::Continue(policy))
}

// submissions of other users are reported the same way as missing ones
async fn owned_submission<S: Store>(store: &mut S, uid: i32, submission_id: i32) -> Result<UserSubmission, Error> {
    match SubmissionCommon::get_for_update(store, submission_id).await? {
        Some(s) if s.user_id == uid => Ok(s),
        _ => Err(Error::SubmissionNotInProgress(submission_id)),
    }
}

async fn active_submission<S: Store>(store: &mut S, uid: i32, submission_id: i32) -> Result<UserSubmission, Error> {
    let submission = owned_submission(store, uid, submission_id).await?;
    if !submission.is_in_progress() {
        return Err(Error::SubmissionNotInProgress(submission_id));
    }
    Ok(submission)
}

async fn terminate<S: Store>(store: &mut S, submission: &mut UserSubmission, now: DateTime<Utc>) -> Result<(), Error> {
    submission.status = SubmissionStatus::Done;
    submission.updated_at = now;
    SubmissionCommon::update(store, submission).await
}

fn check_answer(question: &Question, value: &AnswerValue) -> Result<(), Error> {
    match (question.descriptive, value) {
        (true, AnswerValue::Text(_)) => Ok(()),
        (true, AnswerValue::OptionId(_)) => Err(Error::InvalidAnswer(format!("question {} expects a text answer", question.id))),
        (false, AnswerValue::OptionId(id)) if question.has_option(*id) => Ok(()),
        (false, AnswerValue::OptionId(id)) => Err(Error::InvalidAnswer(format!("option {} does not belong to question {}", id, question.id))),
        (false, AnswerValue::Text(_)) => Err(Error::InvalidAnswer(format!("question {} expects an option", question.id))),
    }
}
