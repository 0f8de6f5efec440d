use crate::{
    error::StoreError,
    models::{ProfileRow, UserProfile},
};
use async_trait::async_trait;
use sqlx::PgPool;
use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};
use tokio::sync::RwLock;

/// ProfileStore
///
/// The persistence contract for user profiles, keyed by identity id.
///
/// `create_profile` must never overwrite: when a profile for the id already
/// exists (for example a concurrent first sign-in won the race), the stored
/// profile is returned unchanged.
///
/// **Send + Sync + async_trait** keep `Arc<dyn ProfileStore>` shareable across
/// axum handlers and session tasks.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, id: &str) -> Result<Option<UserProfile>, StoreError>;
    async fn create_profile(&self, profile: UserProfile) -> Result<UserProfile, StoreError>;
}

/// ProfileStoreState
///
/// The concrete type used to share the profile store across the application.
pub type ProfileStoreState = Arc<dyn ProfileStore>;

/// PostgresProfileStore
///
/// `ProfileStore` backed by the `user_profiles` table
/// (`migrations/20250101000000_user_profiles.sql`).
pub struct PostgresProfileStore {
    pool: PgPool,
}

impl PostgresProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileStore for PostgresProfileStore {
    async fn get_profile(&self, id: &str) -> Result<Option<UserProfile>, StoreError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            "SELECT id, email, display_name, role, created_at FROM user_profiles WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(UserProfile::try_from).transpose()?)
    }

    /// create_profile
    ///
    /// `ON CONFLICT DO NOTHING` keeps the first write; the follow-up read returns
    /// whichever profile ended up stored.
    async fn create_profile(&self, profile: UserProfile) -> Result<UserProfile, StoreError> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO user_profiles (id, email, display_name, role, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&profile.id)
        .bind(&profile.email)
        .bind(&profile.display_name)
        .bind(profile.role.as_str())
        .bind(profile.created_at)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if inserted > 0 {
            return Ok(profile);
        }

        tracing::debug!(id = %profile.id, "profile already existed; keeping stored record");
        self.get_profile(&profile.id)
            .await?
            .ok_or_else(|| StoreError::Unavailable(format!("profile {} vanished", profile.id)))
    }
}

/// InMemoryProfileStore
///
/// Process-local `ProfileStore` used for local runs without a database and in
/// tests. Counts writes and can be switched into a failing mode to exercise the
/// fail-closed resolution path.
#[derive(Default)]
pub struct InMemoryProfileStore {
    profiles: RwLock<HashMap<String, UserProfile>>,
    writes: AtomicUsize,
    failing: AtomicBool,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose every call fails as if the backend were unreachable.
    pub fn new_failing() -> Self {
        let store = Self::default();
        store.set_failing(true);
        store
    }

    /// Seeds a profile without counting it as a write.
    pub async fn with_profile(self, profile: UserProfile) -> Self {
        self.profiles
            .write()
            .await
            .insert(profile.id.clone(), profile);
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of profiles created through `create_profile`.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub async fn len(&self) -> usize {
        self.profiles.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.profiles.read().await.is_empty()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "in-memory store switched to failing mode".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn get_profile(&self, id: &str) -> Result<Option<UserProfile>, StoreError> {
        self.check_available()?;
        Ok(self.profiles.read().await.get(id).cloned())
    }

    async fn create_profile(&self, profile: UserProfile) -> Result<UserProfile, StoreError> {
        self.check_available()?;
        let mut profiles = self.profiles.write().await;
        if let Some(existing) = profiles.get(&profile.id) {
            return Ok(existing.clone());
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        profiles.insert(profile.id.clone(), profile.clone());
        Ok(profile)
    }
}
