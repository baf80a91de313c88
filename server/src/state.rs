use crate::config::AppConfig;
use crate::database::Database;
use crate::views::Views;
use std::sync::Arc;

/// Shared, read-only handles given to every handler. Connections are opened
/// per request from `db`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Database,
    pub views: Arc<Views>,
}

impl AppState {
    pub fn new(config: AppConfig, db: Database, views: Views) -> Self {
        AppState {
            config: Arc::new(config),
            db,
            views: Arc::new(views),
        }
    }
}
