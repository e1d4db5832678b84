use crate::config::Config;
use axum::extract::FromRef;
use sqlx::SqlitePool;

/// Process-wide handles shared by every request.
/// Built once in `main`; the pool lives as long as the process.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Config,
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
