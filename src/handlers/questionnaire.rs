use crate::context::UserInfo;
use crate::core::models::{
    answer::Answer,
    question::Question,
    questionnaire::{Patch, Questionnaire, QuestionnaireCreate},
    report::QuestionResult,
};
use crate::core::ports::{clock::Clock, repository::Manager};
use crate::core::services::{questionnaire as authoring, report};
use crate::error::Error;
use crate::response::{Created, List};
use actix_web::web::{Data, Json, Path};
use actix_web::HttpResponse;

pub async fn create<M: Manager, C: Clock>(user: UserInfo, manager: Data<M>, clock: Data<C>, Json(body): Json<QuestionnaireCreate>) -> Result<Json<Created>, Error> {
    let id = authoring::create_questionnaire(manager.tx().await?, clock.get_ref(), user.id, body).await?;
    Ok(Json(Created { id }))
}

pub async fn detail<M: Manager>(path: Path<(i32,)>, manager: Data<M>) -> Result<Json<Questionnaire>, Error> {
    let (id,) = path.into_inner();
    let mut db = manager.db().await?;
    Ok(Json(authoring::questionnaire_detail(&mut db, id).await?))
}

pub async fn update<M: Manager>(user: UserInfo, path: Path<(i32,)>, manager: Data<M>, Json(patch): Json<Patch>) -> Result<Json<Questionnaire>, Error> {
    let (id,) = path.into_inner();
    let questionnaire = authoring::patch_questionnaire(manager.tx().await?, user.id, id, patch).await?;
    Ok(Json(questionnaire))
}

pub async fn delete<M: Manager>(user: UserInfo, path: Path<(i32,)>, manager: Data<M>) -> Result<HttpResponse, Error> {
    let (id,) = path.into_inner();
    authoring::delete_questionnaire(manager.tx().await?, user.id, id).await?;
    Ok(HttpResponse::Ok().finish())
}

pub async fn questions<M: Manager>(user: UserInfo, path: Path<(i32,)>, manager: Data<M>) -> Result<Json<List<Question>>, Error> {
    let (id,) = path.into_inner();
    let mut db = manager.db().await?;
    Ok(Json(List::new(authoring::questions_of(&mut db, user.id, id).await?)))
}

pub async fn results<M: Manager>(user: UserInfo, path: Path<(i32,)>, manager: Data<M>) -> Result<Json<List<QuestionResult>>, Error> {
    let (id,) = path.into_inner();
    let mut db = manager.db().await?;
    Ok(Json(List::new(report::questionnaire_results(&mut db, user.id, id).await?)))
}

pub async fn submission_answers<M: Manager>(user: UserInfo, path: Path<(i32,)>, manager: Data<M>) -> Result<Json<List<Answer>>, Error> {
    let (id,) = path.into_inner();
    let mut db = manager.db().await?;
    Ok(Json(List::new(report::submission_answers(&mut db, user.id, id).await?)))
}
