mod authorizer;
mod config;
mod context;
mod core;
mod database;
mod error;
mod handlers;
mod impls;
mod middlewares;
mod request;
mod response;

use crate::authorizer::PgAuthorizer;
use crate::config::Config;
use crate::core::ports::clock::SystemClock;
use crate::core::services::submission::SubmissionEngine;
use crate::database::sqlx::PgSqlxManager;
use crate::middlewares::jwt::JWTMiddleware;
use actix_web::middleware::Logger;
use actix_web::web::{scope, Data};
use actix_web::{App, HttpServer};
use env_logger::Env;
use log::{info, Log};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;

fn log_env() -> Env<'static> {
    Env::default().default_filter_or("info")
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(log_env()).init();
    let config = Config::from_env()?;
    let pool = PgPoolOptions::new().max_connections(config.db_max_connections).connect(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("migrations applied");

    let engine_log: Arc<dyn Log> = Arc::new(env_logger::Builder::from_env(log_env()).build());
    let manager = PgSqlxManager::new(pool.clone());
    let engine = Data::new(SubmissionEngine::new(manager.clone(), SystemClock, engine_log));
    let manager = Data::new(manager);
    let clock = Data::new(SystemClock);
    let authorizer = Data::new(PgAuthorizer::new(pool));
    let secret = config.jwt_secret.into_bytes();

    info!("listening on {}", config.bind_addr);
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(engine.clone())
            .app_data(manager.clone())
            .app_data(clock.clone())
            .app_data(authorizer.clone())
            .service(
                scope("")
                    .wrap(JWTMiddleware::new(secret.clone()))
                    .configure(handlers::routes::<PgSqlxManager, SystemClock, PgAuthorizer>),
            )
    })
    .bind(&config.bind_addr)?
    .run()
    .await?;
    Ok(())
}
