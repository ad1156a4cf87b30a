//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! This module binds the HTTP API and the websocket endpoint under a single
//! Axum router. Caller identity comes from the `x-user-id` header (HTTP) or
//! the `user_id` query parameter (websocket); authentication itself happens
//! upstream.

pub mod auth;
pub mod boards;
pub mod elements;
pub mod error;
pub mod ws;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, patch, post, put};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Full application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/boards", post(boards::create_board))
        .route("/api/boards/{id}", get(boards::get_board).patch(boards::update_board))
        .route(
            "/api/boards/{id}/share",
            put(boards::enable_share).delete(boards::disable_share),
        )
        .route("/api/boards/{id}/shared", get(boards::shared_board))
        .route("/api/boards/{id}/users", get(boards::list_users))
        .route(
            "/api/boards/{id}/elements",
            get(elements::list_elements)
                .post(elements::create_elements)
                .delete(elements::delete_elements),
        )
        .route("/api/boards/{id}/elements/batch", patch(elements::apply_batch))
        .route("/api/projects/{id}/members/{user_id}", put(boards::set_member))
        .route("/ws", get(ws::handle_ws))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
