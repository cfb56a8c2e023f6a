use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

mod admin;
pub mod auth;
mod conversations;
mod health;
mod send;
mod volunteers;
mod webhook;

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        // Auth routes
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        // Message pipelines
        .route("/webhook", post(webhook::receive_sms))
        .route("/send", post(send::send_message))
        // Admin
        .route("/admin/approve", post(admin::approve))
        .route("/admin/reject", post(admin::reject))
        .route("/admin/pending", get(admin::pending))
        // Conversations
        .route("/conversations", get(conversations::list))
        .route(
            "/conversations/:id",
            get(conversations::get).patch(conversations::update),
        )
        .route("/conversations/:id/messages", get(conversations::messages))
        .route("/messages/:id", delete(conversations::delete_message))
        // Presence
        .route("/volunteers", get(volunteers::presence))
        .route("/volunteers/heartbeat", post(volunteers::heartbeat));

    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .nest("/api", api)
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
