use crate::config::AppConfig;
use crate::db::SqliteStore;

pub struct AppState {
    pub store: SqliteStore,
    pub config: AppConfig,
}
