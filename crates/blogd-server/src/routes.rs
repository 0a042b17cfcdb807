// ABOUTME: Route definitions for the blogd HTTP API.
// ABOUTME: Merges public, admin-guarded and api-key-guarded routers, static file serving, and the HTTP layers.

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post, put};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::api::{comments, posts, settings, uploads};
use crate::app_state::SharedState;
use crate::auth::AccessLayer;

/// Build the complete Axum router with all routes and shared state.
pub fn create_router(state: SharedState) -> Router {
    let auth = &state.config.auth;

    let public = Router::new()
        .route("/health", get(health))
        .route("/api/v1/posts", get(posts::list_posts))
        .route("/api/v1/posts/{id}", get(posts::get_post))
        .route(
            "/api/v1/comments/public",
            get(comments::list_comments).post(comments::create_comment),
        )
        .route("/api/v1/settings", get(settings::get_settings));

    let admin = Router::new()
        .route("/api/v1/posts", post(posts::create_post))
        .route(
            "/api/v1/posts/{id}",
            put(posts::update_post).delete(posts::delete_post),
        )
        .route("/api/v1/comments", get(comments::list_comments))
        .route(
            "/api/v1/comments/{id}",
            put(comments::update_comment).delete(comments::delete_comment),
        )
        .route("/api/v1/uploads/image", post(uploads::upload_image))
        .route("/api/v1/uploads/music", post(uploads::upload_music))
        .route("/api/v1/uploads/images/{*name}", delete(uploads::delete_image))
        .route("/api/v1/uploads/music/{*name}", delete(uploads::delete_music))
        .route("/api/v1/settings", post(settings::save_settings))
        .route_layer(AccessLayer::admin(auth.admin_token()));

    let integration = Router::new()
        .route("/api/v1/comments/pending", get(comments::list_pending))
        .route("/api/v1/comments/replies", get(comments::list_replies))
        .route("/api/v1/comments", post(comments::create_reply))
        .route_layer(AccessLayer::api_key(auth.api_key()));

    let uploads = &state.config.uploads;
    let mut router = public
        .merge(admin)
        .merge(integration)
        .nest_service("/uploads/images", ServeDir::new(&uploads.images_dir))
        .nest_service("/uploads/music", ServeDir::new(&uploads.music_dir));

    let web = &state.config.web;
    if let Some(dir) = &web.admin_dir {
        router = router.nest_service("/admin", ServeDir::new(dir));
    }
    if let Some(dir) = &web.public_dir {
        router = router.fallback_service(ServeDir::new(dir));
    }

    let body_limit = uploads.max_bytes;
    router
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Health check handler. Returns 200 OK with a simple JSON body.
async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "ok" }))
}
