pub mod questionnaire;
pub mod submission;

use crate::core::ports::{authorizer::Authorizer, clock::Clock, repository::Manager};
use actix_web::web::{self, get, patch, post, resource, scope, ServiceConfig};

/// Registers every route. Expects `Data<SubmissionEngine<M, C>>`, `Data<M>`,
/// `Data<C>` and `Data<A>` in the app data and the JWT middleware in front.
pub fn routes<M, C, A>(cfg: &mut ServiceConfig)
where
    M: Manager + 'static,
    C: Clock + 'static,
    A: Authorizer + 'static,
{
    cfg.route("/start/{questionnaire_id}", get().to(submission::start::<M, C, A>))
        .route("/submit", post().to(submission::submit::<M, C>))
        .route("/next", post().to(submission::next::<M, C>))
        .route("/back", post().to(submission::back::<M, C>))
        .route("/end", post().to(submission::end::<M, C>))
        .route("/check_expire", post().to(submission::check_expire::<M, C>))
        .service(
            scope("/questionnaires")
                .route("", post().to(questionnaire::create::<M, C>))
                .service(
                    resource("/{questionnaire_id}")
                        .route(get().to(questionnaire::detail::<M>))
                        .route(patch().to(questionnaire::update::<M>))
                        .route(web::delete().to(questionnaire::delete::<M>)),
                )
                .route("/{questionnaire_id}/questions", get().to(questionnaire::questions::<M>))
                .route("/{questionnaire_id}/results", get().to(questionnaire::results::<M>)),
        )
        .route("/submissions/{submission_id}/answers", get().to(questionnaire::submission_answers::<M>));
}
