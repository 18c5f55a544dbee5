use crate::error::Error;

pub trait Authorizer {
    /// Whether `uid` holds the grant required to start an anonymous
    /// questionnaire.
    async fn can_start(&self, uid: i32, questionnaire_id: i32) -> Result<bool, Error>;
}
