use std::{future::Future, time::Duration};

use crate::{
    error::StoreError,
    models::{Identity, Role, UserProfile},
    repository::ProfileStoreState,
};

/// RoleResolver
///
/// Maps an identity to exactly one role by lookup-or-create against the profile
/// store. Resolution fails closed: any store failure yields `Role::Public` and
/// is reported through `tracing`, never returned to the caller.
#[derive(Clone)]
pub struct RoleResolver {
    store: ProfileStoreState,
    default_role: Role,
    timeout: Duration,
}

impl RoleResolver {
    /// `default_role` is granted to identities signing in for the first time.
    pub fn new(store: ProfileStoreState, default_role: Role, timeout: Duration) -> Self {
        Self {
            store,
            default_role,
            timeout,
        }
    }

    pub fn default_role(&self) -> Role {
        self.default_role
    }

    pub fn store(&self) -> &ProfileStoreState {
        &self.store
    }

    /// resolve_role
    ///
    /// Returns the stored role for `identity`, creating its profile with the
    /// default role on first sight. Performs at most one store write, and none
    /// once the profile exists.
    pub async fn resolve_role(&self, identity: &Identity) -> Role {
        match self.try_resolve(identity).await {
            Ok(role) => role,
            Err(e) => {
                tracing::error!(
                    identity = %identity.id,
                    error = %e,
                    "role resolution failed; treating session as public"
                );
                Role::Public
            }
        }
    }

    /// lookup_role
    ///
    /// Like `resolve_role` but read-only: an identity with no stored profile
    /// resolves to `Role::Public` and nothing is written.
    pub async fn lookup_role(&self, identity: &Identity) -> Role {
        match self.bounded(self.store.get_profile(&identity.id)).await {
            Ok(Some(profile)) => profile.role,
            Ok(None) => {
                tracing::debug!(identity = %identity.id, "no stored profile; treating session as public");
                Role::Public
            }
            Err(e) => {
                tracing::error!(
                    identity = %identity.id,
                    error = %e,
                    "role lookup failed; treating session as public"
                );
                Role::Public
            }
        }
    }

    async fn try_resolve(&self, identity: &Identity) -> Result<Role, StoreError> {
        if let Some(profile) = self.bounded(self.store.get_profile(&identity.id)).await? {
            return Ok(profile.role);
        }

        let profile = UserProfile::first_sign_in(identity, self.default_role);
        let stored = self.bounded(self.store.create_profile(profile)).await?;
        tracing::info!(identity = %identity.id, role = %stored.role, "created user profile");
        Ok(stored.role)
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| StoreError::Timeout(self.timeout))?
    }
}
