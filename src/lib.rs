use axum::{
    Router,
    extract::{FromRef, Request, State},
    http::HeaderName,
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Access core: roles, route table, resolution and session state.
pub mod error;
pub mod models;
pub mod navigation;
pub mod repository;
pub mod resolver;
pub mod session;

// HTTP surface.
pub mod auth;
pub mod config;
pub mod handlers;
pub mod routes;

use auth::{AccessContext, AuthUser};
use models::NavigationDecision;
use routes::{authenticated, console, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use navigation::{RouteTable, RouteTableState};
pub use repository::{InMemoryProfileStore, PostgresProfileStore, ProfileStoreState};
pub use resolver::RoleResolver;
pub use session::{SessionController, SessionReader, SessionState};

/// ApiDoc
///
/// OpenAPI description of the JSON API, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::resolve_navigation, handlers::get_menu, handlers::get_session,
        handlers::get_me
    ),
    components(
        schemas(
            models::Role, models::UserProfile, models::MenuEntry, models::RouteAccess,
            models::RouteRule, models::NavigationDecision, models::SessionView,
            models::PageView,
        )
    ),
    tags(
        (name = "firesafe-console", description = "Fire-safety console access & navigation API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single shared container for the console's services and configuration.
#[derive(Clone)]
pub struct AppState {
    /// Lookup-or-create role resolution over the profile store.
    pub resolver: RoleResolver,
    /// The immutable route table loaded at start.
    pub routes: RouteTableState,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(profiles: ProfileStoreState, routes: RouteTable, config: AppConfig) -> Self {
        let resolver = RoleResolver::new(
            profiles,
            config.default_role,
            config.role_resolution_timeout,
        );
        Self {
            resolver,
            routes: RouteTableState::new(routes),
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RoleResolver {
    fn from_ref(app_state: &AppState) -> RoleResolver {
        app_state.resolver.clone()
    }
}

impl FromRef<AppState> for RouteTableState {
    fn from_ref(app_state: &AppState) -> RouteTableState {
        app_state.routes.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Guards the authenticated API routes: the `AuthUser` extractor rejects public
/// callers with `401` before the handler runs.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// navigation_guard
///
/// Decides every console page request against the route table. Allowed
/// requests continue with the resolved `AccessContext` cached on the request;
/// denied ones are answered with `303 See Other` to the caller's landing path.
async fn navigation_guard(
    State(routes): State<RouteTableState>,
    context: AccessContext,
    request: Request,
    next: Next,
) -> Response {
    match routes.navigate(context.role, request.uri().path()) {
        NavigationDecision::Allow => next.run(request).await,
        NavigationDecision::Redirect { to } => Redirect::to(&to).into_response(),
    }
}

/// create_router
///
/// Assembles the API, the guarded console pages and the observability layers.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. API Router Assembly (public tier, then the signed-in tier behind auth)
    let api = Router::new()
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        );

    // 3. Console Pages
    // `layer` (not `route_layer`) so the guard also wraps the catch-all fallback.
    let pages = console::console_routes()
        .layer(middleware::from_fn_with_state(
            state.clone(),
            navigation_guard,
        ))
        .with_state(state.clone());

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest("/api", api)
        .with_state(state)
        .fallback_service(pages)
        // 4. Observability and Correlation Layers
        .layer(
            ServiceBuilder::new()
                // 4a. Request ID Generation
                .layer(SetRequestIdLayer::new(
                    x_request_id.clone(),
                    MakeRequestUuid,
                ))
                // 4b. Request Tracing, one span per request
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 4c. Request ID Propagation onto the response
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 5. CORS Layer
        .layer(cors)
}

/// trace_span_logger
///
/// Builds the per-request span, tagging it with the `x-request-id` so every log
/// line of one request correlates.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
