use crate::context::UserInfo;
use crate::core::models::{common::Ctx, question::QuestionView, submission::Started};
use crate::core::ports::{authorizer::Authorizer, clock::Clock, repository::Manager};
use crate::core::services::submission::SubmissionEngine;
use crate::error::Error;
use crate::request::{SubmissionRef, SubmitAnswer};
use crate::response::Created;
use actix_web::web::{Data, Json, Path};
use actix_web::HttpResponse;

type Engine<M, C> = Data<SubmissionEngine<M, C>>;

pub async fn start<M, C, A>(user: UserInfo, ctx: Ctx, path: Path<(i32,)>, engine: Engine<M, C>, authorizer: Data<A>) -> Result<Json<Started>, Error>
where
    M: Manager,
    C: Clock,
    A: Authorizer,
{
    let (questionnaire_id,) = path.into_inner();
    let policy = engine.policy(questionnaire_id).await?;
    if policy.anonymous && !authorizer.can_start(user.id, questionnaire_id).await? {
        return Err(Error::Forbidden);
    }
    let started = engine.start(&ctx, user.id, questionnaire_id).await?;
    Ok(Json(started))
}

pub async fn submit<M, C>(user: UserInfo, ctx: Ctx, engine: Engine<M, C>, Json(body): Json<SubmitAnswer>) -> Result<Json<Created>, Error>
where
    M: Manager,
    C: Clock,
{
    let id = engine.submit(&ctx, user.id, body.submission_id, body.question_id, body.answer).await?;
    Ok(Json(Created { id }))
}

pub async fn next<M, C>(user: UserInfo, ctx: Ctx, engine: Engine<M, C>, Json(body): Json<SubmissionRef>) -> Result<Json<QuestionView>, Error>
where
    M: Manager,
    C: Clock,
{
    Ok(Json(engine.next(&ctx, user.id, body.submission_id).await?))
}

pub async fn back<M, C>(user: UserInfo, ctx: Ctx, engine: Engine<M, C>, Json(body): Json<SubmissionRef>) -> Result<Json<QuestionView>, Error>
where
    M: Manager,
    C: Clock,
{
    Ok(Json(engine.back(&ctx, user.id, body.submission_id).await?))
}

pub async fn end<M, C>(user: UserInfo, ctx: Ctx, engine: Engine<M, C>, Json(body): Json<SubmissionRef>) -> Result<HttpResponse, Error>
where
    M: Manager,
    C: Clock,
{
    engine.end(&ctx, user.id, body.submission_id).await?;
    Ok(HttpResponse::Ok().finish())
}

pub async fn check_expire<M, C>(user: UserInfo, ctx: Ctx, engine: Engine<M, C>, Json(body): Json<SubmissionRef>) -> Result<HttpResponse, Error>
where
    M: Manager,
    C: Clock,
{
    engine.check_expire(&ctx, user.id, body.submission_id).await?;
    Ok(HttpResponse::Ok().finish())
}
