use std::sync::Arc;

use axum::{Router, routing::get};
use color_eyre::eyre::{Context, eyre};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::{
    database::Database,
    http_server::{http_routes::recipes, state::AppState},
};

async fn root() -> &'static str {
    "Hello, World!"
}

pub struct HttpServerConfig {
    pub port: u16,
    pub database: Database,
}

pub fn router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route(
            "/recipes",
            get(recipes::list_recipes).post(recipes::create_recipe),
        )
        .route(
            "/recipes/{id}",
            get(recipes::get_recipe)
                .put(recipes::update_recipe)
                .patch(recipes::partial_update_recipe)
                .delete(recipes::delete_recipe),
        )
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
        .with_state(app_state)
}

pub async fn start(config: HttpServerConfig) -> color_eyre::Result<()> {
    let app_state = Arc::new(AppState {
        db: Arc::new(config.database),
    });

    let app = router(app_state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .wrap_err_with(|| eyre!("Failed to bind to port {}", config.port))?;
    axum::serve(listener, app)
        .await
        .wrap_err("Failed to start HTTP server")?;

    Ok(())
}
