use chrono::Utc;
use firesafe_console::{
    error::StoreError,
    models::{Identity, Role, UserProfile},
    repository::{PostgresProfileStore, ProfileStore},
};
use sqlx::PgPool;

// --- Test Context and Setup ---

/// Holds the pool of the database named by `DATABASE_URL`, migrated to the
/// current schema. Without `DATABASE_URL` the tests below return early.
struct DbTestContext {
    pool: PgPool,
}

impl DbTestContext {
    async fn setup() -> Option<Self> {
        dotenv::dotenv().ok();

        let Ok(db_url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL not set; skipping Postgres integration test");
            return None;
        };

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run database migrations.");

        Some(DbTestContext { pool })
    }

    fn store(&self) -> PostgresProfileStore {
        PostgresProfileStore::new(self.pool.clone())
    }
}

// --- Test Data Helpers ---

/// An id no earlier run has used, so tests never see each other's rows.
fn unique_id(prefix: &str) -> String {
    format!(
        "{prefix}-{}",
        Utc::now().timestamp_nanos_opt().unwrap_or_default()
    )
}

fn profile(id: &str, role: Role) -> UserProfile {
    UserProfile::first_sign_in(&Identity::new(id, Some(format!("{id}@firesafe.test"))), role)
}

// --- Tests ---

#[tokio::test]
async fn test_get_profile_absent_is_none() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };

    let found = ctx.store().get_profile(&unique_id("absent")).await.unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn test_create_then_get_round_trips_profile() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };
    let store = ctx.store();
    let id = unique_id("fresh");

    let created = store.create_profile(profile(&id, Role::Technician)).await.unwrap();
    let fetched = store.get_profile(&id).await.unwrap().unwrap();

    assert_eq!(created.role, Role::Technician);
    assert_eq!(fetched.id, id);
    assert_eq!(fetched.role, Role::Technician);
    assert_eq!(fetched.display_name, id);
}

#[tokio::test]
async fn test_second_create_keeps_stored_role() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };
    let store = ctx.store();
    let id = unique_id("race");

    store.create_profile(profile(&id, Role::Operations)).await.unwrap();
    let second = store.create_profile(profile(&id, Role::Admin)).await.unwrap();

    assert_eq!(second.role, Role::Operations);
    let stored = store.get_profile(&id).await.unwrap().unwrap();
    assert_eq!(stored.role, Role::Operations);
}

#[tokio::test]
async fn test_unknown_stored_role_is_corrupt() {
    let Some(ctx) = DbTestContext::setup().await else {
        return;
    };
    let id = unique_id("corrupt");

    sqlx::query("INSERT INTO user_profiles (id, display_name, role) VALUES ($1, $2, $3)")
        .bind(&id)
        .bind("Corrupt Row")
        .bind("superuser")
        .execute(&ctx.pool)
        .await
        .expect("Failed to insert corrupt row");

    let result = ctx.store().get_profile(&id).await;
    assert!(matches!(result, Err(StoreError::CorruptRole(_))));
}
