use crate::{
    auth::{AccessContext, AuthUser},
    models::{MenuEntry, NavigationDecision, PageView, SessionView, UserProfile},
    navigation::RouteTableState,
    resolver::RoleResolver,
};
use axum::{
    Json,
    extract::{Query, State},
    http::{StatusCode, Uri},
};
use serde::Deserialize;

/// NavigationQuery
///
/// Query parameters for `GET /api/navigation/resolve`.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct NavigationQuery {
    /// The console path the caller wants to open, e.g. `/inventory`.
    pub path: String,
}

/// resolve_navigation
///
/// [Public Route] Lets the frontend router ask where a navigation should end up
/// for the current caller. Denied paths come back as a redirect, never an error.
///
/// The value may carry a query string or fragment (`/inventory?tab=stock`); only
/// its path is matched, as the page guard does. Anything that is not an
/// origin-relative path is a `400 Bad Request`.
#[utoipa::path(
    get,
    path = "/api/navigation/resolve",
    params(NavigationQuery),
    responses(
        (status = 200, description = "Navigation decision", body = NavigationDecision),
        (status = 400, description = "Path is not an origin-relative URL path")
    )
)]
pub async fn resolve_navigation(
    context: AccessContext,
    State(routes): State<RouteTableState>,
    Query(query): Query<NavigationQuery>,
) -> Result<Json<NavigationDecision>, StatusCode> {
    if !query.path.starts_with('/') {
        return Err(StatusCode::BAD_REQUEST);
    }
    let uri = query
        .path
        .parse::<Uri>()
        .map_err(|_| StatusCode::BAD_REQUEST)?;

    Ok(Json(routes.navigate(context.role, uri.path())))
}

/// get_menu
///
/// [Public Route] The side-menu entries visible to the caller, in menu order.
/// Public callers get an empty list.
#[utoipa::path(
    get,
    path = "/api/navigation/menu",
    responses((status = 200, description = "Visible menu", body = [MenuEntry]))
)]
pub async fn get_menu(
    context: AccessContext,
    State(routes): State<RouteTableState>,
) -> Json<Vec<MenuEntry>> {
    Json(routes.visible_menu_items(context.role))
}

/// get_session
///
/// [Public Route] Everything the frontend shell needs for the caller: role,
/// landing path and menu.
#[utoipa::path(
    get,
    path = "/api/session",
    responses((status = 200, description = "Session view", body = SessionView))
)]
pub async fn get_session(
    context: AccessContext,
    State(routes): State<RouteTableState>,
) -> Json<SessionView> {
    Json(SessionView {
        authenticated: context.is_authenticated(),
        role: context.role,
        landing_path: routes.default_landing_path(context.role).to_string(),
        menu: routes.visible_menu_items(context.role),
    })
}

/// get_me
///
/// [Authenticated Route] The caller's stored profile.
///
/// By the time this runs the profile has just been resolved, so `404` only
/// occurs if it disappeared in between; store failures answer `503`.
#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "Profile", body = UserProfile),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "Profile missing"),
        (status = 503, description = "Profile store unavailable")
    )
)]
pub async fn get_me(
    AuthUser { identity, .. }: AuthUser,
    State(resolver): State<RoleResolver>,
) -> Result<Json<UserProfile>, StatusCode> {
    match resolver.store().get_profile(&identity.id).await {
        Ok(Some(profile)) => Ok(Json(profile)),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!(identity = %identity.id, error = %e, "profile lookup failed");
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}

/// render_page
///
/// [Console Route] Catch-all for page requests that passed the navigation
/// guard. Returns the view model the renderer draws the page and menu from.
pub async fn render_page(
    context: AccessContext,
    State(routes): State<RouteTableState>,
    uri: Uri,
) -> Json<PageView> {
    Json(PageView {
        path: uri.path().to_string(),
        role: context.role,
        menu: routes.visible_menu_items(context.role),
    })
}
