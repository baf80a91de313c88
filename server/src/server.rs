use crate::handlers;
use crate::state::AppState;
use axum::extract::DefaultBodyLimit;
use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Post forms carry at most one image.
pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

pub fn build_router(app_state: AppState) -> Router {
    let config = app_state.config.clone();

    Router::new()
        .route("/", get(handlers::index))
        .route("/index.html", get(handlers::index))
        .route("/blogs/:id", get(handlers::blog_detail))
        .route("/about", get(handlers::about))
        .route("/resources", get(handlers::resources_page))
        .route(
            "/admin-login",
            get(handlers::login_page).post(handlers::login),
        )
        .route("/logout", get(handlers::logout))
        .route("/admin", get(handlers::admin_dashboard))
        .route("/add-post", post(handlers::add_post))
        .route(
            "/edit-post/:id",
            get(handlers::edit_post_page).post(handlers::edit_post),
        )
        .route("/delete-post/:id", post(handlers::delete_post))
        .route("/add-resource", post(handlers::add_resource))
        .route("/delete-resource/:id", post(handlers::delete_resource))
        .route("/move-resource/:id/:direction", post(handlers::move_resource))
        .nest_service("/assets", ServeDir::new(&config.assets_dir))
        .nest_service("/uploads", ServeDir::new(&config.upload_dir))
        .fallback_service(ServeDir::new(&config.static_dir))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

pub async fn start_server(app_state: AppState) -> Result<(), Box<dyn std::error::Error>> {
    let addr = app_state.config.bind_addr;
    let app = build_router(app_state);

    let listener = TcpListener::bind(addr).await?;
    info!("Blog server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
