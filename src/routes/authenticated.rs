use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Authenticated API Router
///
/// Routes that require a signed-in caller. The router is wrapped in the
/// `AuthUser` middleware in `create_router`, so handlers here always receive a
/// resolved, non-public identity.
pub fn authenticated_routes() -> Router<AppState> {
    Router::new()
        // GET /me
        // The caller's stored profile (display name, role, creation time).
        .route("/me", get(handlers::get_me))
}
