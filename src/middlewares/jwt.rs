use crate::context::UserInfo;
use crate::core::ports::tokener::{Payload, Tokener};
use crate::error::Error;
use crate::impls::tokener::jwt::JWT;
use actix_web::dev::{Service, ServiceRequest, Transform};
use actix_web::HttpMessage;
use futures::future::{ready, LocalBoxFuture, Ready};
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use std::task::{Context, Poll};

static BEARER: &str = "Bearer ";

#[derive(Debug, Deserialize, Serialize)]
pub struct Claim {
    pub user: String,
    pub exp: i64,
}

impl Payload for Claim {
    fn user(&self) -> &str {
        &self.user
    }
}

/// Rejects requests without a valid `Authorization: Bearer` token and puts the
/// caller's [`UserInfo`] into the request extensions.
pub struct JWTMiddleware {
    secret: Vec<u8>,
}

impl JWTMiddleware {
    pub fn new(secret: Vec<u8>) -> Self {
        Self { secret }
    }
}

impl<S> Transform<S, ServiceRequest> for JWTMiddleware
where
    S: Service<ServiceRequest, Error = actix_web::Error> + 'static,
    S::Future: 'static,
    S::Response: 'static,
{
    type Error = actix_web::Error;
    type Response = S::Response;
    type Transform = JWTService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JWTService {
            tokener: Rc::new(JWT::new(&self.secret)),
            next_service: service,
        }))
    }
}

pub struct JWTService<S> {
    tokener: Rc<JWT>,
    next_service: S,
}

impl<S> JWTService<S> {
    fn identify(&self, req: &ServiceRequest) -> Result<UserInfo, Error> {
        let header = req.headers().get("Authorization").ok_or(Error::Unauthorized)?;
        let token = header.to_str().map_err(|_| Error::Unauthorized)?;
        let token = token.strip_prefix(BEARER).ok_or(Error::Unauthorized)?;
        let claim: Claim = self.tokener.verify_token(token)?;
        let id = claim.user().parse::<i32>().map_err(|_| Error::Unauthorized)?;
        Ok(UserInfo { id })
    }
}

impl<S> Service<ServiceRequest> for JWTService<S>
where
    S: Service<ServiceRequest, Error = actix_web::Error>,
    S::Future: 'static,
    S::Response: 'static,
{
    type Response = S::Response;
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    fn poll_ready(&self, ctx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.next_service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        match self.identify(&req) {
            Ok(user) => {
                req.extensions_mut().insert(user);
                Box::pin(self.next_service.call(req))
            }
            Err(e) => Box::pin(ready(Err(e.into()))),
        }
    }
}
