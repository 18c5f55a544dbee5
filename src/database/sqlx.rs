use crate::core::models::{
    answer::{Answer, Query as AnswerQuery, Upsert as AnswerUpsert},
    option::{Insert as OptionInsert, Opt},
    question::{Insert as QuestionInsert, Question},
    questionnaire::{Insert as QuestionnaireInsert, Patch as QuestionnairePatch, Policy, Questionnaire},
    submission::{Insert as SubmissionInsert, Query as SubmissionQuery, SubmissionStatus, UserSubmission},
};
use crate::core::ports::repository::{AnswerCommon, Common, Manager, OptionCommon, QuestionCommon, QuestionnaireCommon, Store, SubmissionCommon, TxStore};
use crate::error::Error;
use sqlx::pool::PoolConnection;
use sqlx::{query, query_as, query_scalar, Executor, FromRow, PgPool, Postgres, QueryBuilder, Transaction};
use std::collections::HashMap;

pub struct PgSqlx<E>
where
    for<'e> &'e mut E: Executor<'e>,
{
    executor: E,
}

impl<E> PgSqlx<E>
where
    for<'e> &'e mut E: Executor<'e>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }
}

#[derive(Clone)]
pub struct PgSqlxManager {
    pool: PgPool,
}

impl PgSqlxManager {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn begin(&self) -> Result<PgSqlx<Transaction<'static, Postgres>>, Error> {
        let tx = self.pool.begin().await?;
        Ok(PgSqlx::new(tx))
    }

    pub async fn acquire(&self) -> Result<PgSqlx<PoolConnection<Postgres>>, Error> {
        let conn = self.pool.acquire().await?;
        Ok(PgSqlx::new(conn))
    }
}

impl Manager for PgSqlxManager {
    type Store = PgSqlx<PoolConnection<Postgres>>;
    type Tx = PgSqlx<Transaction<'static, Postgres>>;

    async fn db(&self) -> Result<Self::Store, Error> {
        self.acquire().await
    }

    async fn tx(&self) -> Result<Self::Tx, Error> {
        self.begin().await
    }
}

impl Common for PgSqlx<PoolConnection<Postgres>> {}
impl<'a> Common for PgSqlx<Transaction<'a, Postgres>> {}
impl Store for PgSqlx<PoolConnection<Postgres>> {}
impl<'a> Store for PgSqlx<Transaction<'a, Postgres>> {}

impl<'a> TxStore for PgSqlx<Transaction<'a, Postgres>> {
    async fn commit(self) -> Result<(), Error> {
        self.executor.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), Error> {
        self.executor.rollback().await?;
        Ok(())
    }
}

impl<E> QuestionnaireCommon for PgSqlx<E>
where
    for<'e> &'e mut E: Executor<'e, Database = Postgres>,
{
    async fn insert(&mut self, data: QuestionnaireInsert) -> Result<i32, Error> {
        let id = query_scalar(
            "
        INSERT INTO questionnaires (owner_id, title, created_at, start_time, end_time, random, back_compatible, answer_time_secs, anonymous, submit_limit)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING id",
        )
        .bind(data.owner_id)
        .bind(data.title)
        .bind(data.created_at)
        .bind(data.start_time)
        .bind(data.end_time)
        .bind(data.random)
        .bind(data.back_compatible)
        .bind(data.answer_time_secs)
        .bind(data.anonymous)
        .bind(data.submit_limit)
        .fetch_one(&mut self.executor)
        .await?;
        Ok(id)
    }

    async fn get(&mut self, id: i32) -> Result<Option<Questionnaire>, Error> {
        let q = query_as("SELECT * FROM questionnaires WHERE id = $1").bind(id).fetch_optional(&mut self.executor).await?;
        Ok(q)
    }

    async fn get_for_update(&mut self, id: i32) -> Result<Option<Questionnaire>, Error> {
        let q = query_as("SELECT * FROM questionnaires WHERE id = $1 FOR UPDATE").bind(id).fetch_optional(&mut self.executor).await?;
        Ok(q)
    }

    async fn policy(&mut self, id: i32) -> Result<Option<Policy>, Error> {
        let policy = query_as(
            "
        SELECT
            id AS questionnaire_id,
            start_time,
            end_time,
            answer_time_secs,
            back_compatible,
            submit_limit,
            anonymous,
            random
        FROM questionnaires
        WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut self.executor)
        .await?;
        Ok(policy)
    }

    async fn patch(&mut self, id: i32, patch: &QuestionnairePatch) -> Result<(), Error> {
        if patch.is_empty() {
            return Ok(());
        }
        let mut stmt = QueryBuilder::<Postgres>::new("UPDATE questionnaires SET ");
        {
            let mut set = stmt.separated(", ");
            if let Some(title) = &patch.title {
                set.push("title = ").push_bind_unseparated(title.clone());
            }
            if let Some(start_time) = patch.start_time {
                set.push("start_time = ").push_bind_unseparated(start_time);
            }
            if let Some(end_time) = patch.end_time {
                set.push("end_time = ").push_bind_unseparated(end_time);
            }
            if let Some(random) = patch.random {
                set.push("random = ").push_bind_unseparated(random);
            }
            if let Some(back_compatible) = patch.back_compatible {
                set.push("back_compatible = ").push_bind_unseparated(back_compatible);
            }
            if let Some(answer_time_secs) = patch.answer_time_secs {
                set.push("answer_time_secs = ").push_bind_unseparated(answer_time_secs);
            }
            if let Some(anonymous) = patch.anonymous {
                set.push("anonymous = ").push_bind_unseparated(anonymous);
            }
            if let Some(submit_limit) = patch.submit_limit {
                set.push("submit_limit = ").push_bind_unseparated(submit_limit);
            }
        }
        stmt.push(" WHERE id = ").push_bind(id);
        stmt.build().execute(&mut self.executor).await?;
        Ok(())
    }

    async fn delete(&mut self, id: i32) -> Result<(), Error> {
        query("DELETE FROM questionnaires WHERE id = $1").bind(id).execute(&mut self.executor).await?;
        Ok(())
    }

    async fn increase_participation(&mut self, id: i32) -> Result<(), Error> {
        query("UPDATE questionnaires SET participation_count = participation_count + 1 WHERE id = $1")
            .bind(id)
            .execute(&mut self.executor)
            .await?;
        Ok(())
    }
}

#[derive(FromRow)]
struct QuestionRow {
    id: i32,
    questionnaire_id: i32,
    index_: i32,
    text: String,
    descriptive: bool,
    correct_option_id: Option<i32>,
}

#[derive(FromRow)]
struct OptRow {
    id: i32,
    question_id: i32,
    index_: i32,
    text: String,
}

impl<E> QuestionCommon for PgSqlx<E>
where
    for<'e> &'e mut E: Executor<'e, Database = Postgres>,
{
    async fn insert(&mut self, question: QuestionInsert) -> Result<i32, Error> {
        let id = query_scalar("INSERT INTO questions (questionnaire_id, index_, text, descriptive) VALUES ($1, $2, $3, $4) RETURNING id")
            .bind(question.questionnaire_id)
            .bind(question.index)
            .bind(question.text)
            .bind(question.descriptive)
            .fetch_one(&mut self.executor)
            .await?;
        Ok(id)
    }

    async fn set_correct_option(&mut self, id: i32, option_id: i32) -> Result<(), Error> {
        query("UPDATE questions SET correct_option_id = $1 WHERE id = $2")
            .bind(option_id)
            .bind(id)
            .execute(&mut self.executor)
            .await?;
        Ok(())
    }

    async fn list_ordered(&mut self, questionnaire_id: i32) -> Result<Vec<Question>, Error> {
        let rows: Vec<QuestionRow> = query_as("SELECT * FROM questions WHERE questionnaire_id = $1 ORDER BY index_")
            .bind(questionnaire_id)
            .fetch_all(&mut self.executor)
            .await?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i32> = rows.iter().map(|r| r.id).collect();
        let opts: Vec<OptRow> = query_as("SELECT * FROM options WHERE question_id = ANY($1) ORDER BY question_id, index_")
            .bind(ids)
            .fetch_all(&mut self.executor)
            .await?;
        let mut by_question: HashMap<i32, Vec<Opt>> = HashMap::new();
        for o in opts {
            by_question.entry(o.question_id).or_default().push(Opt {
                id: o.id,
                question_id: o.question_id,
                index: o.index_,
                text: o.text,
            });
        }
        Ok(rows
            .into_iter()
            .map(|r| Question {
                options: by_question.remove(&r.id).unwrap_or_default(),
                id: r.id,
                questionnaire_id: r.questionnaire_id,
                index: r.index_,
                text: r.text,
                descriptive: r.descriptive,
                correct_option_id: r.correct_option_id,
            })
            .collect())
    }
}

impl<E> OptionCommon for PgSqlx<E>
where
    for<'e> &'e mut E: Executor<'e, Database = Postgres>,
{
    async fn insert(&mut self, option: OptionInsert) -> Result<i32, Error> {
        let id = query_scalar("INSERT INTO options (question_id, index_, text) VALUES ($1, $2, $3) RETURNING id")
            .bind(option.question_id)
            .bind(option.index)
            .bind(option.text)
            .fetch_one(&mut self.executor)
            .await?;
        Ok(id)
    }
}

impl<E> SubmissionCommon for PgSqlx<E>
where
    for<'e> &'e mut E: Executor<'e, Database = Postgres>,
{
    async fn insert(&mut self, data: SubmissionInsert) -> Result<i32, Error> {
        let id = query_scalar(
            "
        INSERT INTO user_submissions (user_id, questionnaire_id, status, current_question_index, created_at, updated_at)
        VALUES ($1, $2, $3, 0, $4, $4)
        RETURNING id",
        )
        .bind(data.user_id)
        .bind(data.questionnaire_id)
        .bind(SubmissionStatus::InProgress)
        .bind(data.created_at)
        .fetch_one(&mut self.executor)
        .await?;
        Ok(id)
    }

    async fn get(&mut self, id: i32) -> Result<Option<UserSubmission>, Error> {
        let s = query_as("SELECT * FROM user_submissions WHERE id = $1").bind(id).fetch_optional(&mut self.executor).await?;
        Ok(s)
    }

    async fn get_for_update(&mut self, id: i32) -> Result<Option<UserSubmission>, Error> {
        let s = query_as("SELECT * FROM user_submissions WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut self.executor)
            .await?;
        Ok(s)
    }

    async fn in_progress_for_update(&mut self, user_id: i32, questionnaire_id: i32) -> Result<Option<UserSubmission>, Error> {
        let s = query_as("SELECT * FROM user_submissions WHERE user_id = $1 AND questionnaire_id = $2 AND status = $3 FOR UPDATE")
            .bind(user_id)
            .bind(questionnaire_id)
            .bind(SubmissionStatus::InProgress)
            .fetch_optional(&mut self.executor)
            .await?;
        Ok(s)
    }

    async fn count(&mut self, query: &SubmissionQuery) -> Result<i64, Error> {
        let mut stmt = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM user_submissions WHERE 1 = 1");
        if let Some(uid) = query.user_id_eq {
            stmt.push(" AND user_id = ").push_bind(uid);
        }
        if let Some(qid) = query.questionnaire_id_eq {
            stmt.push(" AND questionnaire_id = ").push_bind(qid);
        }
        let (n,): (i64,) = stmt.build_query_as().fetch_one(&mut self.executor).await?;
        Ok(n)
    }

    async fn lock_attempts(&mut self, user_id: i32, questionnaire_id: i32) -> Result<(), Error> {
        query("SELECT pg_advisory_xact_lock($1, $2)")
            .bind(user_id)
            .bind(questionnaire_id)
            .execute(&mut self.executor)
            .await?;
        Ok(())
    }

    async fn update(&mut self, submission: &UserSubmission) -> Result<(), Error> {
        query("UPDATE user_submissions SET status = $1, current_question_index = $2, updated_at = $3 WHERE id = $4")
            .bind(submission.status)
            .bind(submission.current_question_index)
            .bind(submission.updated_at)
            .bind(submission.id)
            .execute(&mut self.executor)
            .await?;
        Ok(())
    }
}

impl<E> AnswerCommon for PgSqlx<E>
where
    for<'e> &'e mut E: Executor<'e, Database = Postgres>,
{
    async fn upsert(&mut self, answer: AnswerUpsert) -> Result<i32, Error> {
        let id = query_scalar(
            "
        INSERT INTO answers (question_id, user_id, submission_id, descriptive, text, option_id)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (question_id, submission_id) DO UPDATE
        SET descriptive = EXCLUDED.descriptive, text = EXCLUDED.text, option_id = EXCLUDED.option_id
        RETURNING id",
        )
        .bind(answer.question_id)
        .bind(answer.user_id)
        .bind(answer.submission_id)
        .bind(answer.descriptive)
        .bind(answer.text)
        .bind(answer.option_id)
        .fetch_one(&mut self.executor)
        .await?;
        Ok(id)
    }

    async fn query(&mut self, query: &AnswerQuery) -> Result<Vec<Answer>, Error> {
        let mut stmt = QueryBuilder::<Postgres>::new(
            "
        SELECT a.*
        FROM answers AS a
        JOIN questions AS q ON a.question_id = q.id
        WHERE 1 = 1",
        );
        if let Some(sid) = query.submission_id_eq {
            stmt.push(" AND a.submission_id = ").push_bind(sid);
        }
        if let Some(qid) = query.questionnaire_id_eq {
            stmt.push(" AND q.questionnaire_id = ").push_bind(qid);
        }
        stmt.push(" ORDER BY q.index_, a.id");
        let answers: Vec<Answer> = stmt.build_query_as().fetch_all(&mut self.executor).await?;
        Ok(answers)
    }
}
