pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use crate::services::{attempt_service::AttemptService, test_service::TestService};
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub test_service: TestService,
    pub attempt_service: AttemptService,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        let config = crate::config::get_config();

        let test_service = TestService::new(pool.clone());
        let attempt_service = AttemptService::new(pool.clone(), config.scoring());

        Self {
            pool,
            test_service,
            attempt_service,
        }
    }
}
