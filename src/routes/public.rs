use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public API Router
///
/// Endpoints any client may call. The navigation and session endpoints answer
/// for whoever is calling, so a public caller simply sees the public view.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness check for load balancers.
        .route("/health", get(|| async { "ok" }))
        // GET /session
        // Role, landing path and menu for the current caller.
        .route("/session", get(handlers::get_session))
        // GET /navigation/menu
        // The caller's visible menu entries, in menu order.
        .route("/navigation/menu", get(handlers::get_menu))
        // GET /navigation/resolve?path=/inventory
        // Allow-or-redirect decision for a console path.
        .route("/navigation/resolve", get(handlers::resolve_navigation))
}
