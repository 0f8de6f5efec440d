use firesafe_console::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    navigation::RouteTable,
    repository::{InMemoryProfileStore, PostgresProfileStore, ProfileStoreState},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Loads configuration, sets up logging, the profile store and the route table,
/// then serves the console.
#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let config = AppConfig::load();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "firesafe_console=debug,tower_http=info,axum=info".into());

    // Pretty output for local debugging, JSON for the log aggregator in production.
    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!(env = ?config.env, "console starting");

    let profiles: ProfileStoreState = match &config.db_url {
        Some(db_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(db_url)
                .await
                .expect("FATAL: Failed to connect to Postgres. Check DATABASE_URL.");
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .expect("FATAL: Failed to run database migrations.");
            Arc::new(PostgresProfileStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; user profiles are kept in memory");
            Arc::new(InMemoryProfileStore::new())
        }
    };

    // The route table is process-wide and immutable from here on.
    let routes = match &config.route_table_path {
        Some(path) => RouteTable::from_file(path)
            .unwrap_or_else(|e| panic!("FATAL: invalid route table: {e}")),
        None => RouteTable::default(),
    };
    tracing::info!(
        rules = routes.rules.len(),
        menu_entries = routes.menu.len(),
        "route table loaded"
    );

    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(profiles, routes, config);
    tracing::info!(
        default_role = %state.resolver.default_role(),
        "first sign-ins get the default role"
    );
    let app = create_router(state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("FATAL: cannot bind {bind_addr}: {e}"));

    tracing::info!("Listening on {bind_addr}");
    tracing::info!("API documentation available at /swagger-ui");

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!(error = %e, "server stopped");
    }
}
