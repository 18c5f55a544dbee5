use crate::core::models::question::QuestionCreate;
use crate::error::Error;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow, PartialEq, Eq)]
pub struct Questionnaire {
    pub id: i32,
    pub owner_id: i32,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub random: bool,
    pub back_compatible: bool,
    pub answer_time_secs: i64,
    pub anonymous: bool,
    pub submit_limit: i32,
    pub participation_count: i64,
}

impl Questionnaire {
    pub fn policy(&self) -> Policy {
        Policy {
            questionnaire_id: self.id,
            start_time: self.start_time,
            end_time: self.end_time,
            answer_time_secs: self.answer_time_secs,
            back_compatible: self.back_compatible,
            submit_limit: self.submit_limit,
            anonymous: self.anonymous,
            random: self.random,
        }
    }

    /// Applies every field present in `patch`, leaving the others untouched.
    pub fn apply(&mut self, patch: Patch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(start_time) = patch.start_time {
            self.start_time = start_time;
        }
        if let Some(end_time) = patch.end_time {
            self.end_time = end_time;
        }
        if let Some(random) = patch.random {
            self.random = random;
        }
        if let Some(back_compatible) = patch.back_compatible {
            self.back_compatible = back_compatible;
        }
        if let Some(answer_time_secs) = patch.answer_time_secs {
            self.answer_time_secs = answer_time_secs;
        }
        if let Some(anonymous) = patch.anonymous {
            self.anonymous = anonymous;
        }
        if let Some(submit_limit) = patch.submit_limit {
            self.submit_limit = submit_limit;
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        check_settings(&self.title, self.start_time, self.end_time, self.answer_time_secs, self.submit_limit)
    }
}

/// The part of a questionnaire the submission engine acts on.
#[derive(Debug, Clone, Serialize, FromRow, PartialEq, Eq)]
pub struct Policy {
    pub questionnaire_id: i32,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub answer_time_secs: i64,
    pub back_compatible: bool,
    pub submit_limit: i32,
    pub anonymous: bool,
    pub random: bool,
}

impl Policy {
    /// `None` when attempts are not time boxed.
    pub fn answer_time(&self) -> Option<Duration> {
        if self.answer_time_secs > 0 {
            Some(Duration::seconds(self.answer_time_secs))
        } else {
            None
        }
    }

    pub fn is_available(&self, now: DateTime<Utc>) -> bool {
        self.start_time.map_or(true, |s| now >= s) && self.end_time.map_or(true, |e| now <= e)
    }

    pub fn is_expired(&self, started_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        self.answer_time().map_or(false, |limit| now - started_at > limit)
    }
}

#[derive(Debug, Deserialize)]
pub struct QuestionnaireCreate {
    pub title: String,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub random: bool,
    #[serde(default)]
    pub back_compatible: bool,
    #[serde(default)]
    pub answer_time_secs: i64,
    #[serde(default)]
    pub anonymous: bool,
    #[serde(default)]
    pub submit_limit: i32,
    pub questions: Vec<QuestionCreate>,
}

#[derive(Debug, Clone)]
pub struct Insert {
    pub owner_id: i32,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub random: bool,
    pub back_compatible: bool,
    pub answer_time_secs: i64,
    pub anonymous: bool,
    pub submit_limit: i32,
}

impl Insert {
    pub fn validate(&self) -> Result<(), Error> {
        check_settings(&self.title, self.start_time, self.end_time, self.answer_time_secs, self.submit_limit)
    }
}

/// Partial update. `start_time`/`end_time` distinguish "leave as is" (`None`)
/// from "clear" (`Some(None)`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Patch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub start_time: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "present")]
    pub end_time: Option<Option<DateTime<Utc>>>,
    #[serde(default)]
    pub random: Option<bool>,
    #[serde(default)]
    pub back_compatible: Option<bool>,
    #[serde(default)]
    pub answer_time_secs: Option<i64>,
    #[serde(default)]
    pub anonymous: Option<bool>,
    #[serde(default)]
    pub submit_limit: Option<i32>,
}

impl Patch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.start_time.is_none()
            && self.end_time.is_none()
            && self.random.is_none()
            && self.back_compatible.is_none()
            && self.answer_time_secs.is_none()
            && self.anonymous.is_none()
            && self.submit_limit.is_none()
    }
}

// a field that is present, even as `null`, becomes `Some`
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn check_settings(title: &str, start_time: Option<DateTime<Utc>>, end_time: Option<DateTime<Utc>>, answer_time_secs: i64, submit_limit: i32) -> Result<(), Error> {
    if title.trim().is_empty() {
        return Err(Error::InvalidQuestionnaire("title is empty".into()));
    }
    if let (Some(start), Some(end)) = (start_time, end_time) {
        if start >= end {
            return Err(Error::InvalidQuestionnaire("start time must be earlier than end time".into()));
        }
    }
    if answer_time_secs < 0 {
        return Err(Error::InvalidQuestionnaire("answer time is negative".into()));
    }
    if submit_limit < 0 {
        return Err(Error::InvalidQuestionnaire("submit limit is negative".into()));
    }
    Ok(())
}
