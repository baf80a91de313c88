pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod layout;
pub mod models;
pub mod posts;
pub mod resources;
pub mod security;
pub mod server;
pub mod state;
pub mod uploads;
pub mod views;

use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn start() -> Result<(), Box<dyn std::error::Error>> {
    let config = config::AppConfig::from_env()?;
    let db = database::Database::open(&config.database_path)?;
    std::fs::create_dir_all(&config.upload_dir)?;
    let views = views::Views::new()?;

    server::start_server(state::AppState::new(config, db, views)).await
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(start())
}
