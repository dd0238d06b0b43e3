use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{services::ServeDir, trace::TraceLayer};

use super::{handlers, jobs, middleware::auth_middleware, middleware::metrics_middleware};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Read routes share the authenticator through middleware; submission
    // authenticates inside the admission gateway
    let auth = middleware::from_fn_with_state(Arc::clone(&state), auth_middleware);

    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Jobs
        .route(
            "/jobs",
            post(jobs::submit_job).merge(get(jobs::list_jobs).route_layer(auth.clone())),
        )
        .route("/jobs/{id}", get(jobs::get_job).route_layer(auth))
        .with_state(Arc::clone(&state));

    // Read path over the sink root, standing in for the CDN
    let media = ServeDir::new(&state.config().sink.root);

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics).with_state(Arc::clone(&state)))
        .nest_service("/media", media)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
}
