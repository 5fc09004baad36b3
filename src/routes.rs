// src/routes.rs

use std::sync::Arc;

use axum::{
    Router, http::Method,
    middleware,
    routing::{get, post},
};
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, auth, contact, dashboard, quiz, resultats},
    state::AppState,
    utils::jwt::auth_middleware,
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, admin, resultats, quiz, dashboard, contact).
/// * Applies global middleware (Trace, CORS) and per-group rate limits.
/// * Injects global state (pool, config, admin token registry).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    // Cookies require credentialed CORS with explicit origins.
    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ])
        .allow_credentials(true);

    // Auth endpoints: 20 requests / 15 min / IP. One token replenished
    // every 45s with a burst of 20.
    let auth_governor = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(45)
            .burst_size(20)
            .finish()
            .unwrap(),
    );

    // Quiz endpoints: 100 requests / 15 min / IP.
    let quiz_governor = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(9)
            .burst_size(100)
            .finish()
            .unwrap(),
    );

    let auth_routes = Router::new()
        .route("/inscription", post(auth::inscription))
        .route("/connexion", post(auth::connexion))
        .route("/refresh", post(auth::refresh))
        .layer(GovernorLayer::new(auth_governor))
        .merge(
            Router::new()
                .route("/session", get(auth::session))
                .route("/deconnexion", post(auth::deconnexion))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        );

    let admin_routes = Router::new()
        .route("/login", post(admin::admin_login))
        .merge(
            Router::new()
                .route("/save-notes", post(admin::save_notes))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    admin::admin_middleware,
                )),
        );

    let resultats_routes = Router::new()
        .route(
            "/",
            get(resultats::resultats_for_session).post(resultats::resultats_by_code),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let quiz_routes = Router::new()
        .route("/{quiz_name}", post(quiz::submit_quiz))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(GovernorLayer::new(quiz_governor));

    let dashboard_routes = Router::new()
        .route("/stats", get(dashboard::stats))
        .route("/classement", get(dashboard::classement))
        .route("/progression", get(dashboard::progression))
        .route("/quizzes", get(dashboard::quizzes))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/admin", admin_routes)
        .nest("/api/resultats", resultats_routes)
        .nest("/api/quiz", quiz_routes)
        .nest("/api/dashboard", dashboard_routes)
        .route("/api/contact", post(contact::contact))
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
