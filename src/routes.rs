// src/routes.rs

use axum::{
    Router, http::Method, middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{auth, export, results, submissions, surveys},
    state::AppState,
    utils::jwt::auth_middleware,
};

/// Assembles the main application router.
///
/// * Public routes: survey listing, fetch-by-public-id, submission.
/// * Creator routes (JWT): authoring, results, exports, history.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let survey_routes = Router::new()
        // Public: listing, direct fetch, submission (optional token).
        .route("/", get(surveys::list_surveys))
        .route("/{id}", get(surveys::get_survey))
        .route("/{id}/submit", post(submissions::submit_survey))
        // Protected: authoring and creator analytics.
        .merge(
            Router::new()
                .route("/", post(surveys::create_survey))
                .route("/participated", get(submissions::participated))
                .route("/{id}/results", get(results::survey_results))
                .route("/{id}/export/csv", get(export::export_csv))
                .route("/{id}/export/grid", get(export::export_grid))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        );

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/surveys", survey_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
