use crate::core::ports::authorizer::Authorizer;
use crate::error::Error;
use sqlx::{query_as, PgPool};

pub struct PgAuthorizer {
    pool: PgPool,
}

impl PgAuthorizer {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl Authorizer for PgAuthorizer {
    async fn can_start(&self, uid: i32, questionnaire_id: i32) -> Result<bool, Error> {
        let (granted,): (bool,) = query_as(
            "SELECT EXISTS(SELECT 1 FROM questionnaire_grants WHERE user_id = $1 AND questionnaire_id = $2)
            OR EXISTS(SELECT 1 FROM questionnaires WHERE id = $2 AND owner_id = $1)",
        )
        .bind(uid)
        .bind(questionnaire_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(granted)
    }
}
