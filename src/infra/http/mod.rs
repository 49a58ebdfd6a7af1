pub mod auth;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod state;

pub use state::ApiState;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    middleware as axum_middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use sqlx::Error as SqlxError;

use crate::application::error::ErrorReport;

pub fn build_api_router(state: ApiState) -> Router {
    Router::new()
        .route(
            "/api/v1/profile",
            get(handlers::get_profile).post(handlers::save_profile),
        )
        .route("/api/v1/conferences", post(handlers::create_conference))
        .route(
            "/api/v1/conferences/created",
            get(handlers::list_created_conferences),
        )
        .route(
            "/api/v1/conferences/attending",
            get(handlers::list_attending_conferences),
        )
        .route(
            "/api/v1/conferences/query",
            post(handlers::query_conferences),
        )
        .route("/api/v1/conferences/{id}", get(handlers::get_conference))
        .route(
            "/api/v1/conferences/{id}/registration",
            post(handlers::register).delete(handlers::unregister),
        )
        .route(
            "/api/v1/conferences/{id}/sessions",
            get(handlers::list_sessions).post(handlers::create_session),
        )
        .route(
            "/api/v1/conferences/{id}/sessions/type/{session_type}",
            get(handlers::list_sessions_by_type),
        )
        .route(
            "/api/v1/conferences/{id}/sessions/by-date",
            get(handlers::list_sessions_by_date),
        )
        .route(
            "/api/v1/conferences/{id}/speakers",
            get(handlers::list_conference_speakers),
        )
        .route(
            "/api/v1/conferences/{id}/wishlist",
            get(handlers::list_wishlist),
        )
        .route(
            "/api/v1/sessions/{id}/wishlist",
            post(handlers::wishlist_add).delete(handlers::wishlist_remove),
        )
        .route(
            "/api/v1/sessions/speaker/{speaker_id}",
            get(handlers::list_sessions_by_speaker),
        )
        .route("/api/v1/speakers", get(handlers::list_speakers))
        .route(
            "/api/v1/speakers/featured",
            get(handlers::get_featured_speaker),
        )
        .route("/api/v1/announcement", get(handlers::get_announcement))
        .layer(axum_middleware::from_fn(auth::require_identity))
        .route("/health/db", get(db_health))
        .layer(axum_middleware::from_fn(middleware::log_responses))
        .layer(axum_middleware::from_fn(middleware::set_request_context))
        .with_state(state)
}

async fn db_health(State(state): State<ApiState>) -> Response {
    db_health_response(state.db.health_check().await)
}

fn db_health_response(result: Result<(), SqlxError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}
