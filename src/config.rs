use crate::error::Error;

pub static DATABASE_URL: &str = "DATABASE_URL";
pub static JWT_SECRET: &str = "JWT_SECRET";
pub static BIND_ADDR: &str = "BIND_ADDR";
pub static DB_MAX_CONNECTIONS: &str = "DB_MAX_CONNECTIONS";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
}

impl Config {
    /// Reads the process environment after loading `.env`, if there is one.
    pub fn from_env() -> Result<Self, Error> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| lookup(key).filter(|v| !v.is_empty()).ok_or_else(|| Error::ConfigError(format!("{} is not set", key)));
        let db_max_connections = match lookup(DB_MAX_CONNECTIONS) {
            Some(v) => v.parse::<u32>()?,
            None => DEFAULT_MAX_CONNECTIONS,
        };
        Ok(Self {
            database_url: required(DATABASE_URL)?,
            jwt_secret: required(JWT_SECRET)?,
            bind_addr: lookup(BIND_ADDR).unwrap_or_else(|| DEFAULT_BIND_ADDR.into()),
            db_max_connections,
        })
    }
}
