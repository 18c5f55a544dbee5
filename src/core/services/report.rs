use crate::core::models::{
    answer::{Answer, Query as AnswerQuery},
    report::{OptionCount, QuestionResult},
};
use crate::core::ports::repository::{AnswerCommon, QuestionCommon, Store, SubmissionCommon};
use crate::core::services::questionnaire::owned_questionnaire;
use crate::error::Error;
use std::collections::HashMap;

/// Per-question results of a questionnaire for its owner, in question order.
/// Every option is listed, including the ones nobody picked.
pub async fn questionnaire_results<S>(storer: &mut S, uid: i32, questionnaire_id: i32) -> Result<Vec<QuestionResult>, Error>
where
    S: Store,
{
    owned_questionnaire(storer, uid, questionnaire_id, false).await?;
    let questions = QuestionCommon::list_ordered(storer, questionnaire_id).await?;
    let answers = AnswerCommon::query(
        storer,
        &AnswerQuery {
            questionnaire_id_eq: Some(questionnaire_id),
            ..default::default()
        },
    )
    .await?;
    let mut by_question: HashMap<i32, Vec<Answer>> = HashMap::new();
    for a in answers {
        by_question.entry(a.question_id).or_default().push(a);
    }
    let results = questions
        .into_iter()
        .map(|q| {
            let answers = by_question.remove(&q.id).unwrap_or_default();
            let options = q
                .options
                .into_iter()
                .map(|o| OptionCount {
                    count: answers.iter().filter(|a| a.option_id == Some(o.id)).count() as i64,
                    option_id: o.id,
                    text: o.text,
                })
                .collect();
            QuestionResult {
                question_id: q.id,
                index: q.index,
                text: q.text,
                descriptive: q.descriptive,
                answered: answers.len() as i64,
                options,
                texts: answers.into_iter().filter_map(|a| a.text).collect(),
            }
        })
        .collect();
    Ok(results)
}

/// Answers the caller gave in one of their own submissions.
pub async fn submission_answers<S>(storer: &mut S, uid: i32, submission_id: i32) -> Result<Vec<Answer>, Error>
where
    S: Store,
{
    match SubmissionCommon::get(storer, submission_id).await? {
        Some(s) if s.user_id == uid => {}
        _ => return Err(Error::SubmissionNotFound(submission_id)),
    }
    AnswerCommon::query(
        storer,
        &AnswerQuery {
            submission_id_eq: Some(submission_id),
            ..default::default()
        },
    )
    .await
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::models::answer::AnswerValue;
    use crate::core::models::common::Ctx;
    use crate::core::models::option::OptCreate;
    use crate::core::models::question::QuestionCreate;
    use crate::core::models::questionnaire::QuestionnaireCreate;
    use crate::core::ports::repository::Manager;
    use crate::core::services::questionnaire::create_questionnaire;
    use crate::core::services::submission::SubmissionEngine;
    use crate::database::memory::{FixedClock, MemManager, RecordingLog};
    use std::sync::Arc;

    fn poll() -> QuestionnaireCreate {
        QuestionnaireCreate {
            title: "lunch".into(),
            start_time: None,
            end_time: None,
            random: false,
            back_compatible: true,
            answer_time_secs: 0,
            anonymous: false,
            submit_limit: 0,
            questions: vec![
                QuestionCreate {
                    text: "where".into(),
                    descriptive: false,
                    options: ["canteen", "park", "desk"].iter().map(|t| OptCreate { text: t.to_string() }).collect(),
                    correct_option: None,
                },
                QuestionCreate {
                    text: "anything else".into(),
                    descriptive: true,
                    options: vec![],
                    correct_option: None,
                },
            ],
        }
    }

    #[tokio::test]
    async fn test_results_count_every_option() {
        let m = MemManager::default();
        let engine = SubmissionEngine::new(m.clone(), FixedClock::default(), Arc::new(RecordingLog::default()));
        let ctx = Ctx::new("report");
        let qid = create_questionnaire(m.tx().await.unwrap(), &FixedClock::default(), 1, poll()).await.unwrap();

        for (user, pick, note) in [(10, 0, "soup"), (11, 0, "no"), (12, 1, "")] {
            let started = engine.start(&ctx, user, qid).await.unwrap();
            let s = started.submission_id;
            let option = started.question.options[pick].id;
            engine.submit(&ctx, user, s, started.question.id, AnswerValue::OptionId(option)).await.unwrap();
            if !note.is_empty() {
                let q = engine.next(&ctx, user, s).await.unwrap();
                engine.submit(&ctx, user, s, q.id, AnswerValue::Text(note.into())).await.unwrap();
            }
        }

        let mut db = m.db().await.unwrap();
        assert!(matches!(questionnaire_results(&mut db, 10, qid).await, Err(Error::Forbidden)));
        let results = questionnaire_results(&mut db, 1, qid).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].answered, 3);
        assert_eq!(results[0].options.iter().map(|o| o.count).collect::<Vec<_>>(), vec![2, 1, 0]);
        assert!(results[0].texts.is_empty());
        assert_eq!(results[1].answered, 2);
        assert!(results[1].options.is_empty());
        assert_eq!(results[1].texts, vec!["soup".to_string(), "no".to_string()]);
    }

    #[tokio::test]
    async fn test_submission_answers_only_for_owner() {
        let m = MemManager::default();
        let engine = SubmissionEngine::new(m.clone(), FixedClock::default(), Arc::new(RecordingLog::default()));
        let ctx = Ctx::new("report");
        let qid = create_questionnaire(m.tx().await.unwrap(), &FixedClock::default(), 1, poll()).await.unwrap();
        let started = engine.start(&ctx, 5, qid).await.unwrap();
        let s = started.submission_id;
        engine.submit(&ctx, 5, s, started.question.id, AnswerValue::OptionId(started.question.options[2].id)).await.unwrap();

        let mut db = m.db().await.unwrap();
        let answers = submission_answers(&mut db, 5, s).await.unwrap();
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].option_id, Some(started.question.options[2].id));
        assert!(matches!(submission_answers(&mut db, 6, s).await, Err(Error::SubmissionNotFound(_))));
        assert!(matches!(submission_answers(&mut db, 5, 999).await, Err(Error::SubmissionNotFound(999))));
    }
}
