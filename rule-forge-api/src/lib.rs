//! rule-forge API server
//!
//! REST surface for saving, listing, executing, and deleting rules.
//! Everything under `/api/v1` except login/register sits behind the
//! auth middleware, which resolves a Bearer API key or a `session`
//! JWT cookie to the caller's user id.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod service;
pub mod state;

pub use auth::{AuthService, AuthUser};
pub use error::{ApiError, ServiceError};
pub use service::RuleService;
pub use state::AppState;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

pub fn create_router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/rules", post(handlers::save_rule).get(handlers::list_rules))
        .route(
            "/rules/:name",
            get(handlers::get_rule).delete(handlers::delete_rule),
        )
        .route("/rules/:name/execute", post(handlers::execute_rule))
        .route("/auth/me", get(auth::me))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    let api_v1 = Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/register", post(auth::register))
        .merge(protected);

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api_v1)
        .fallback_service(ServeDir::new("web/static"))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
