pub mod cache;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod state;

pub use state::ApiState;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};

use crate::infra::http::middleware::{log_responses, set_request_context};

pub fn build_router(state: ApiState) -> Router {
    let admin = Router::new()
        .route("/api/cache/clear", post(cache::clear))
        .route("/api/cache/invalidate", post(cache::invalidate))
        .route("/api/cache/keys", get(cache::keys))
        .route("/api/cache/warmup", post(cache::warmup))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_admin,
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/health", get(handlers::health))
        .route("/api/health/db", get(handlers::db_health))
        .route(
            "/api/articles",
            get(handlers::list_articles).post(handlers::create_article),
        )
        .route(
            "/api/articles/{id}",
            get(handlers::get_article)
                .patch(handlers::update_article)
                .delete(handlers::delete_article),
        )
        .route("/api/products", get(handlers::list_products))
        .route("/api/products/{id}", get(handlers::get_product))
        .route("/api/team", get(handlers::list_team))
        .route("/api/wordpress/posts", get(handlers::list_wordpress_posts))
        .route(
            "/api/wordpress/posts/{id}",
            get(handlers::get_wordpress_post),
        )
        .route("/api/cache/status", get(cache::status))
        .merge(admin)
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}
