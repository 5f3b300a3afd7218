// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{params, policy, sanitize},
    middleware::sanitize_params,
    state::AppState,
};

/// Assembles the main application router.
///
/// * Policy and sanitize routes take text as-is; they pick the policy themselves.
/// * Params routes run behind the `sanitize_params` filter.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(parsed) if origin != "*" => Some(parsed),
            _ => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    let policy_routes = Router::new()
        .route("/api/policies", get(policy::list_policies))
        .route("/api/policies/{name}", get(policy::get_policy));

    let sanitize_routes = Router::new().route("/api/sanitize", post(sanitize::clean_text));

    // Only these routes get their parameters rewritten.
    let params_routes = Router::new()
        .route(
            "/api/params",
            get(params::echo_params).post(params::echo_params),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            sanitize_params,
        ));

    Router::new()
        .merge(policy_routes)
        .merge(sanitize_routes)
        .merge(params_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
