use ai::AiClient;
use config::Config;
use sqlx::PgPool;

pub mod ai;
pub mod analytics;
pub mod common;
pub mod config;
pub mod middleware;
pub mod utils;

pub mod routes;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub ai: AiClient,
}
