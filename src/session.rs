//! Session-level auth state.
//!
//! A [`SessionController`] owns the current [`SessionState`] and is its only
//! writer. Views and route guards hold a [`SessionReader`], which can observe
//! changes but never mutate the state.
//!
//! Lifecycle: `Unresolved` until the first identity-change event, then `Public`
//! or `Authenticated`. Sign-out moves `Authenticated` to `Public`. Nothing goes
//! back to `Unresolved` short of building a new controller.

use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;

use crate::{
    models::{Identity, NavigationDecision, Role},
    navigation::RouteTableState,
    resolver::RoleResolver,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Identity unknown; the first resolution has not finished.
    Unresolved,
    Public,
    Authenticated { identity: Identity, role: Role },
}

impl SessionState {
    /// The role route decisions use, or `None` while unresolved.
    pub fn role(&self) -> Option<Role> {
        match self {
            SessionState::Unresolved => None,
            SessionState::Public => Some(Role::Public),
            SessionState::Authenticated { role, .. } => Some(*role),
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            SessionState::Authenticated { identity, .. } => Some(identity),
            _ => None,
        }
    }
}

/// Outcome of a page request against the live session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// Still resolving: render a loading indicator, decide nothing.
    Suspended,
    Decided(NavigationDecision),
}

/// SessionController
///
/// Drives the session state machine from identity-change events.
///
/// Every event takes a fresh epoch. A resolution only publishes if its epoch is
/// still current when it finishes, and that check runs under the channel's write
/// lock, so a slow lookup for an old identity can never overwrite the state set
/// by a newer event or by sign-out.
pub struct SessionController {
    resolver: RoleResolver,
    routes: RouteTableState,
    epoch: AtomicU64,
    tx: watch::Sender<SessionState>,
}

impl SessionController {
    pub fn new(resolver: RoleResolver, routes: RouteTableState) -> Self {
        let (tx, _rx) = watch::channel(SessionState::Unresolved);
        Self {
            resolver,
            routes,
            epoch: AtomicU64::new(0),
            tx,
        }
    }

    pub fn subscribe(&self) -> SessionReader {
        SessionReader {
            rx: self.tx.subscribe(),
            routes: self.routes.clone(),
        }
    }

    pub fn current(&self) -> SessionState {
        self.tx.borrow().clone()
    }

    /// on_identity_change
    ///
    /// Handles one event from the identity source. `None` publishes `Public`
    /// immediately; `Some` resolves the role and publishes `Authenticated`, or
    /// `Public` when resolution failed closed.
    pub async fn on_identity_change(&self, identity: Option<Identity>) {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;

        let Some(identity) = identity else {
            self.publish(epoch, SessionState::Public);
            return;
        };

        let role = self.resolver.resolve_role(&identity).await;
        let next = if role.is_authenticated() {
            SessionState::Authenticated { identity, role }
        } else {
            SessionState::Public
        };

        if !self.publish(epoch, next) {
            tracing::debug!(epoch, "discarding stale role resolution");
        }
    }

    /// clear_role
    ///
    /// Sign-out: publishes `Public` before returning and invalidates any
    /// resolution still in flight. The profile store is not touched.
    pub fn clear_role(&self) {
        let epoch = &self.epoch;
        self.tx.send_modify(|state| {
            epoch.fetch_add(1, Ordering::SeqCst);
            *state = SessionState::Public;
        });
        tracing::info!("session signed out");
    }

    /// Decides a page request against the current state.
    pub fn navigate(&self, path: &str) -> NavigationOutcome {
        decide(&self.routes, &self.tx.borrow(), path)
    }

    fn publish(&self, epoch: u64, next: SessionState) -> bool {
        let current_epoch = &self.epoch;
        self.tx.send_if_modified(|state| {
            if current_epoch.load(Ordering::SeqCst) != epoch {
                return false;
            }
            *state = next;
            true
        })
    }
}

/// SessionReader
///
/// Read-only view of a session for the many components that render from it.
#[derive(Clone)]
pub struct SessionReader {
    rx: watch::Receiver<SessionState>,
    routes: RouteTableState,
}

impl SessionReader {
    pub fn current(&self) -> SessionState {
        self.rx.borrow().clone()
    }

    /// Waits for the next published state. Returns `None` once the controller
    /// has been dropped.
    pub async fn changed(&mut self) -> Option<SessionState> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    pub fn navigate(&self, path: &str) -> NavigationOutcome {
        decide(&self.routes, &self.rx.borrow(), path)
    }
}

fn decide(routes: &RouteTableState, state: &SessionState, path: &str) -> NavigationOutcome {
    match state.role() {
        None => NavigationOutcome::Suspended,
        Some(role) => NavigationOutcome::Decided(routes.navigate(role, path)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::StoreError,
        models::UserProfile,
        navigation::RouteTable,
        repository::{InMemoryProfileStore, ProfileStore},
    };
    use async_trait::async_trait;
    use std::{sync::Arc, time::Duration};
    use tokio::sync::Notify;

    fn controller(store: Arc<dyn ProfileStore>, default_role: Role) -> SessionController {
        let resolver = RoleResolver::new(store, default_role, Duration::from_secs(1));
        SessionController::new(resolver, Arc::new(RouteTable::default()))
    }

    fn identity(id: &str) -> Identity {
        Identity::new(id, None)
    }

    #[tokio::test]
    async fn starts_unresolved_and_suspends_navigation() {
        let session = controller(Arc::new(InMemoryProfileStore::new()), Role::Client);
        assert_eq!(session.current(), SessionState::Unresolved);
        assert_eq!(session.navigate("/"), NavigationOutcome::Suspended);
    }

    #[tokio::test]
    async fn null_identity_yields_public() {
        let session = controller(Arc::new(InMemoryProfileStore::new()), Role::Client);
        session.on_identity_change(None).await;

        assert_eq!(session.current(), SessionState::Public);
        assert_eq!(
            session.navigate("/dashboard"),
            NavigationOutcome::Decided(NavigationDecision::Redirect { to: "/".into() })
        );
    }

    #[tokio::test]
    async fn identity_resolves_to_authenticated() {
        let session = controller(Arc::new(InMemoryProfileStore::new()), Role::Client);
        session.on_identity_change(Some(identity("c-1"))).await;

        assert_eq!(session.current().role(), Some(Role::Client));
        assert_eq!(
            session.navigate("/portal"),
            NavigationOutcome::Decided(NavigationDecision::Allow)
        );
    }

    #[tokio::test]
    async fn store_failure_yields_public_not_error() {
        let session = controller(Arc::new(InMemoryProfileStore::new_failing()), Role::Client);
        session.on_identity_change(Some(identity("c-2"))).await;

        assert_eq!(session.current(), SessionState::Public);
    }

    #[tokio::test]
    async fn sign_out_is_visible_before_next_decision() {
        let session = controller(Arc::new(InMemoryProfileStore::new()), Role::Admin);
        let reader = session.subscribe();
        session.on_identity_change(Some(identity("a-1"))).await;
        assert_eq!(
            reader.navigate("/team"),
            NavigationOutcome::Decided(NavigationDecision::Allow)
        );

        session.clear_role();

        assert_eq!(reader.current(), SessionState::Public);
        assert_eq!(
            reader.navigate("/team"),
            NavigationOutcome::Decided(NavigationDecision::Redirect { to: "/".into() })
        );
    }

    #[tokio::test]
    async fn readers_observe_transitions() {
        let session = controller(Arc::new(InMemoryProfileStore::new()), Role::Sales);
        let mut reader = session.subscribe();

        session.on_identity_change(Some(identity("s-1"))).await;

        let seen = reader.changed().await.unwrap();
        assert_eq!(seen.role(), Some(Role::Sales));
        assert_eq!(seen.identity().map(|i| i.id.as_str()), Some("s-1"));
    }

    /// Holds lookups for one identity until released, so a test can finish a
    /// newer event while an older one is still in flight.
    struct GatedStore {
        inner: InMemoryProfileStore,
        gated_id: String,
        gate: Notify,
    }

    #[async_trait]
    impl ProfileStore for GatedStore {
        async fn get_profile(&self, id: &str) -> Result<Option<UserProfile>, StoreError> {
            if id == self.gated_id {
                self.gate.notified().await;
            }
            self.inner.get_profile(id).await
        }

        async fn create_profile(&self, profile: UserProfile) -> Result<UserProfile, StoreError> {
            self.inner.create_profile(profile).await
        }
    }

    #[tokio::test]
    async fn stale_resolution_does_not_overwrite_newer_state() {
        let admin = UserProfile::first_sign_in(&identity("old"), Role::Admin);
        let store = Arc::new(GatedStore {
            inner: InMemoryProfileStore::new().with_profile(admin).await,
            gated_id: "old".to_string(),
            gate: Notify::new(),
        });
        let session = Arc::new(controller(store.clone(), Role::Client));

        let stale = {
            let session = session.clone();
            tokio::spawn(async move { session.on_identity_change(Some(identity("old"))).await })
        };
        tokio::task::yield_now().await;

        session.on_identity_change(Some(identity("new"))).await;
        assert_eq!(session.current().role(), Some(Role::Client));

        store.gate.notify_one();
        stale.await.unwrap();

        assert_eq!(session.current().role(), Some(Role::Client));
        assert_eq!(
            session.current().identity().map(|i| i.id.as_str()),
            Some("new")
        );
    }

    #[tokio::test]
    async fn sign_out_discards_in_flight_resolution() {
        let store = Arc::new(GatedStore {
            inner: InMemoryProfileStore::new(),
            gated_id: "pending".to_string(),
            gate: Notify::new(),
        });
        let session = Arc::new(controller(store.clone(), Role::Client));

        let in_flight = {
            let session = session.clone();
            tokio::spawn(async move { session.on_identity_change(Some(identity("pending"))).await })
        };
        tokio::task::yield_now().await;

        session.clear_role();
        store.gate.notify_one();
        in_flight.await.unwrap();

        assert_eq!(session.current(), SessionState::Public);
    }
}
