use crate::core::models::common::Ctx;
use actix_web::dev::Payload;
use actix_web::{Error, FromRequest, HttpMessage, HttpRequest};
use std::future::{ready, Ready};
use uuid::Uuid;

pub static REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug, Clone)]
pub struct UserInfo {
    pub id: i32,
}

impl FromRequest for UserInfo {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;
    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        match req.extensions().get::<Self>() {
            Some(user) => ready(Ok(user.clone())),
            None => ready(Err(crate::error::Error::Unauthorized.into())),
        }
    }
}

/// Takes the caller's request id when one is sent, otherwise makes one up.
impl FromRequest for Ctx {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;
    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let ctx = match req.headers().get(REQUEST_ID_HEADER).and_then(|v| v.to_str().ok()) {
            Some(id) if !id.is_empty() => Ctx::new(id),
            _ => Ctx::new(Uuid::new_v4()),
        };
        ready(Ok(ctx))
    }
}
