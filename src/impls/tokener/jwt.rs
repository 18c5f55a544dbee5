use crate::core::ports::tokener::{Payload, Tokener};
use crate::error::Error;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

pub struct JWT {
    key: DecodingKey,
}

impl JWT {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            key: DecodingKey::from_secret(secret),
        }
    }
}

impl<P> Tokener<P> for JWT
where
    P: Payload,
{
    fn verify_token(&self, token: &str) -> Result<P, Error> {
        let validation = Validation::new(Algorithm::HS256);
        let payload = decode(token, &self.key, &validation)?;
        Ok(payload.claims)
    }
}
