use crate::core::models::{
    option::Insert as OptionInsert,
    question::{Insert as QuestionInsert, Question, QuestionCreate},
    questionnaire::{Insert as QuestionnaireInsert, Patch, Questionnaire, QuestionnaireCreate},
    submission::Query as SubmissionQuery,
};
use crate::core::ports::clock::Clock;
use crate::core::ports::repository::{OptionCommon, QuestionCommon, QuestionnaireCommon, Store, SubmissionCommon, TxStore};
use crate::error::Error;

pub async fn create_questionnaire<T, C>(mut storer: T, clock: &C, uid: i32, data: QuestionnaireCreate) -> Result<i32, Error>
where
    T: TxStore,
    C: Clock,
{
    let insert = QuestionnaireInsert {
        owner_id: uid,
        title: data.title,
        created_at: clock.now(),
        start_time: data.start_time,
        end_time: data.end_time,
        random: data.random,
        back_compatible: data.back_compatible,
        answer_time_secs: data.answer_time_secs,
        anonymous: data.anonymous,
        submit_limit: data.submit_limit,
    };
    insert.validate()?;
    data.questions.iter().enumerate().try_for_each(|(i, q)| check_question(i, q))?;
    let questionnaire_id = QuestionnaireCommon::insert(&mut storer, insert).await?;
    for (index, q) in (0..).zip(data.questions) {
        let question_id = QuestionCommon::insert(
            &mut storer,
            QuestionInsert {
                questionnaire_id,
                index,
                text: q.text,
                descriptive: q.descriptive,
            },
        )
        .await?;
        let mut option_ids = Vec::with_capacity(q.options.len());
        for (opt_index, opt) in (0..).zip(q.options) {
            let option_id = OptionCommon::insert(
                &mut storer,
                OptionInsert {
                    question_id,
                    index: opt_index,
                    text: opt.text,
                },
            )
            .await?;
            option_ids.push(option_id);
        }
        if let Some(option_id) = q.correct_option.and_then(|i| option_ids.get(i)) {
            QuestionCommon::set_correct_option(&mut storer, question_id, *option_id).await?;
        }
    }
    storer.commit().await?;
    Ok(questionnaire_id)
}

pub async fn questionnaire_detail<S>(storer: &mut S, id: i32) -> Result<Questionnaire, Error>
where
    S: Store,
{
    QuestionnaireCommon::get(storer, id).await?.ok_or(Error::QuestionnaireNotFound(id))
}

/// Applies `patch` and returns the updated questionnaire. Only allowed while
/// nobody has started an attempt.
pub async fn patch_questionnaire<T>(mut storer: T, uid: i32, id: i32, patch: Patch) -> Result<Questionnaire, Error>
where
    T: TxStore,
{
    let mut questionnaire = owned_questionnaire(&mut storer, uid, id, true).await?;
    if patch.is_empty() {
        return Ok(questionnaire);
    }
    let submissions = SubmissionCommon::count(
        &mut storer,
        &SubmissionQuery {
            questionnaire_id_eq: Some(id),
            ..default::default()
        },
    )
    .await?;
    if submissions > 0 {
        return Err(Error::QuestionnaireLocked(id));
    }
    questionnaire.apply(patch.clone());
    questionnaire.validate()?;
    QuestionnaireCommon::patch(&mut storer, id, &patch).await?;
    storer.commit().await?;
    Ok(questionnaire)
}

pub async fn delete_questionnaire<T>(mut storer: T, uid: i32, id: i32) -> Result<(), Error>
where
    T: TxStore,
{
    owned_questionnaire(&mut storer, uid, id, true).await?;
    QuestionnaireCommon::delete(&mut storer, id).await?;
    storer.commit().await?;
    Ok(())
}

pub async fn questions_of<S>(storer: &mut S, uid: i32, id: i32) -> Result<Vec<Question>, Error>
where
    S: Store,
{
    owned_questionnaire(storer, uid, id, false).await?;
    QuestionCommon::list_ordered(storer, id).await
}

pub(crate) async fn owned_questionnaire<S>(storer: &mut S, uid: i32, id: i32, for_update: bool) -> Result<Questionnaire, Error>
where
    S: Store,
{
    let questionnaire = if for_update {
        QuestionnaireCommon::get_for_update(storer, id).await?
    } else {
        QuestionnaireCommon::get(storer, id).await?
    };
    let questionnaire = questionnaire.ok_or(Error::QuestionnaireNotFound(id))?;
    if questionnaire.owner_id != uid {
        return Err(Error::Forbidden);
    }
    Ok(questionnaire)
}

fn check_question(position: usize, question: &QuestionCreate) -> Result<(), Error> {
    if question.text.trim().is_empty() {
        return Err(Error::InvalidQuestionnaire(format!("question {} has no text", position)));
    }
    if question.descriptive {
        if !question.options.is_empty() || question.correct_option.is_some() {
            return Err(Error::InvalidQuestionnaire(format!("descriptive question {} cannot have options", position)));
        }
        return Ok(());
    }
    if question.options.is_empty() {
        return Err(Error::InvalidQuestionnaire(format!("question {} has no options", position)));
    }
    match question.correct_option {
        Some(i) if i >= question.options.len() => Err(Error::InvalidQuestionnaire(format!("correct option of question {} is out of range", position))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::models::option::OptCreate;
    use crate::core::models::submission::Insert as SubmissionInsert;
    use crate::core::ports::repository::Manager;
    use crate::database::memory::{FixedClock, MemManager};
    use chrono::{Duration, Utc};

    fn choice(text: &str, options: &[&str], correct_option: Option<usize>) -> QuestionCreate {
        QuestionCreate {
            text: text.into(),
            descriptive: false,
            options: options.iter().map(|o| OptCreate { text: o.to_string() }).collect(),
            correct_option,
        }
    }

    fn data(questions: Vec<QuestionCreate>) -> QuestionnaireCreate {
        QuestionnaireCreate {
            title: "survey".into(),
            start_time: None,
            end_time: None,
            random: false,
            back_compatible: false,
            answer_time_secs: 0,
            anonymous: false,
            submit_limit: 0,
            questions,
        }
    }

    #[tokio::test]
    async fn test_create_assigns_indices_from_input_order() {
        let m = MemManager::default();
        let questions = vec![
            choice("colour", &["red", "green", "blue"], Some(2)),
            QuestionCreate {
                text: "why".into(),
                descriptive: true,
                options: vec![],
                correct_option: None,
            },
        ];
        let clock = FixedClock::default();
        let id = create_questionnaire(m.tx().await.unwrap(), &clock, 7, data(questions)).await.unwrap();

        let mut db = m.db().await.unwrap();
        let detail = questionnaire_detail(&mut db, id).await.unwrap();
        assert_eq!(detail.owner_id, 7);
        assert_eq!(detail.created_at, clock.now());
        assert_eq!(detail.participation_count, 0);
        let list = questions_of(&mut db, 7, id).await.unwrap();
        assert_eq!(list.iter().map(|q| q.index).collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(list[0].options.iter().map(|o| o.text.as_str()).collect::<Vec<_>>(), vec!["red", "green", "blue"]);
        assert_eq!(list[0].correct_option_id, Some(list[0].options[2].id));
        assert!(list[1].descriptive);
        assert!(list[1].options.is_empty());
    }

    #[tokio::test]
    async fn test_create_rejects_bad_input_without_writing() {
        let m = MemManager::default();
        let res = create_questionnaire(m.tx().await.unwrap(), &FixedClock::default(), 1, data(vec![choice("pick", &["a"], Some(1))])).await;
        assert!(matches!(res, Err(Error::InvalidQuestionnaire(_))));

        let now = Utc::now();
        let inverted = QuestionnaireCreate {
            start_time: Some(now),
            end_time: Some(now - Duration::hours(1)),
            ..data(vec![])
        };
        let res = create_questionnaire(m.tx().await.unwrap(), &FixedClock::default(), 1, inverted).await;
        assert!(matches!(res, Err(Error::InvalidQuestionnaire(_))));

        let res = create_questionnaire(m.tx().await.unwrap(), &FixedClock::default(), 1, data(vec![choice("empty", &[], None)])).await;
        assert!(matches!(res, Err(Error::InvalidQuestionnaire(_))));
        assert!(m.snapshot().await.questionnaires.is_empty());
    }

    #[tokio::test]
    async fn test_patch_owner_only_and_locked_after_start() {
        let m = MemManager::default();
        let clock = FixedClock::default();
        let id = create_questionnaire(m.tx().await.unwrap(), &clock, 1, data(vec![choice("pick", &["a", "b"], None)])).await.unwrap();

        let patch = Patch {
            title: Some("renamed".into()),
            submit_limit: Some(2),
            ..Default::default()
        };
        let res = patch_questionnaire(m.tx().await.unwrap(), 2, id, patch.clone()).await;
        assert!(matches!(res, Err(Error::Forbidden)));

        let patched = patch_questionnaire(m.tx().await.unwrap(), 1, id, patch.clone()).await.unwrap();
        assert_eq!(patched.title, "renamed");
        assert_eq!(patched.submit_limit, 2);
        assert_eq!(m.snapshot().await.questionnaires[&id], patched);

        let mut tx = m.tx().await.unwrap();
        SubmissionCommon::insert(
            &mut tx,
            SubmissionInsert {
                user_id: 3,
                questionnaire_id: id,
                created_at: clock.now(),
            },
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        let res = patch_questionnaire(m.tx().await.unwrap(), 1, id, patch).await;
        assert!(matches!(res, Err(Error::QuestionnaireLocked(_))));
    }

    #[tokio::test]
    async fn test_patch_validates_result() {
        let m = MemManager::default();
        let id = create_questionnaire(m.tx().await.unwrap(), &FixedClock::default(), 1, data(vec![])).await.unwrap();
        let patch = Patch {
            answer_time_secs: Some(-5),
            ..Default::default()
        };
        let res = patch_questionnaire(m.tx().await.unwrap(), 1, id, patch).await;
        assert!(matches!(res, Err(Error::InvalidQuestionnaire(_))));
        assert_eq!(m.snapshot().await.questionnaires[&id].answer_time_secs, 0);
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let m = MemManager::default();
        let id = create_questionnaire(m.tx().await.unwrap(), &FixedClock::default(), 1, data(vec![choice("pick", &["a", "b"], None)])).await.unwrap();
        assert!(matches!(delete_questionnaire(m.tx().await.unwrap(), 9, id).await, Err(Error::Forbidden)));
        delete_questionnaire(m.tx().await.unwrap(), 1, id).await.unwrap();

        let state = m.snapshot().await;
        assert!(state.questionnaires.is_empty());
        assert!(state.questions.is_empty());
        let mut db = m.db().await.unwrap();
        assert!(matches!(questionnaire_detail(&mut db, id).await, Err(Error::QuestionnaireNotFound(_))));
    }
}
