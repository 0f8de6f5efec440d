use crate::{AppState, handlers};
use axum::Router;

/// Console Page Router
///
/// A single catch-all: every non-API path is a console page. The navigation
/// guard layered on in `create_router` decides each request against the route
/// table before `render_page` runs.
pub fn console_routes() -> Router<AppState> {
    Router::new().fallback(handlers::render_page)
}
