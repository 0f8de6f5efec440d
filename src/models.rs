use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::{fmt, str::FromStr};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::error::RoleParseError;

// --- Identity & Roles ---

/// Role
///
/// The single authorization level attached to a session. `Public` is the absence
/// state: no identity, or an identity whose role could not be resolved.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, Default,
)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    Admin,
    Sales,
    Operations,
    Technician,
    Accounts,
    Client,
    #[default]
    Public,
}

impl Role {
    /// Every role, most privileged first.
    pub const ALL: [Role; 7] = [
        Role::Admin,
        Role::Sales,
        Role::Operations,
        Role::Technician,
        Role::Accounts,
        Role::Client,
        Role::Public,
    ];

    /// True for every role except `Public`.
    pub fn is_authenticated(&self) -> bool {
        !matches!(self, Role::Public)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Sales => "sales",
            Role::Operations => "operations",
            Role::Technician => "technician",
            Role::Accounts => "accounts",
            Role::Client => "client",
            Role::Public => "public",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Role::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| RoleParseError(s.to_string()))
    }
}

/// Identity
///
/// The external identity provider's handle for a signed-in user. This crate only
/// observes identities; it never creates or destroys them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: Option<String>,
}

impl Identity {
    pub fn new(id: impl Into<String>, email: Option<String>) -> Self {
        Self {
            id: id.into(),
            email,
        }
    }
}

/// UserProfile
///
/// Persisted role-and-metadata record keyed by the identity id. Created on the
/// first successful sign-in and never re-created afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UserProfile {
    pub id: String,
    pub email: Option<String>,
    pub display_name: String,
    pub role: Role,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    /// Builds the profile written on first resolution of `identity`.
    pub fn first_sign_in(identity: &Identity, role: Role) -> Self {
        let display_name = identity
            .email
            .as_deref()
            .and_then(|email| email.split('@').next())
            .filter(|local| !local.is_empty())
            .unwrap_or(&identity.id)
            .to_string();

        Self {
            id: identity.id.clone(),
            email: identity.email.clone(),
            display_name,
            role,
            created_at: Utc::now(),
        }
    }
}

/// ProfileRow
///
/// Raw `user_profiles` row. The role column is free text, so it is parsed into
/// a `Role` on the way out of the database.
#[derive(Debug, Clone, FromRow)]
pub struct ProfileRow {
    pub id: String,
    pub email: Option<String>,
    pub display_name: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ProfileRow> for UserProfile {
    type Error = RoleParseError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        Ok(UserProfile {
            role: row.role.parse()?,
            id: row.id,
            email: row.email,
            display_name: row.display_name,
            created_at: row.created_at,
        })
    }
}

// --- Route Table Schemas ---

/// RouteAccess
///
/// Who may view a route. Serialized as `"public"`, `"authenticated"` or
/// `{ "roles": [...] }` in route table files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum RouteAccess {
    Public,
    Authenticated,
    Roles(Vec<Role>),
}

impl RouteAccess {
    pub fn permits(&self, role: Role) -> bool {
        match self {
            RouteAccess::Public => true,
            RouteAccess::Authenticated => role.is_authenticated(),
            // `Public` listed here would widen a private route; only authenticated
            // roles count.
            RouteAccess::Roles(roles) => role.is_authenticated() && roles.contains(&role),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RouteRule {
    pub path: String,
    pub access: RouteAccess,
}

impl RouteRule {
    pub fn new(path: impl Into<String>, access: RouteAccess) -> Self {
        Self {
            path: path.into(),
            access,
        }
    }
}

/// MenuEntry
///
/// One item of the console side menu. Visibility is decided by the rule that
/// governs `path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct MenuEntry {
    pub label: String,
    pub path: String,
}

impl MenuEntry {
    pub fn new(label: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            path: path.into(),
        }
    }
}

// --- Navigation Output Schemas ---

/// NavigationDecision
///
/// Result of checking a path for a role. There is no "forbidden" outcome: every
/// denied request is redirected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
#[ts(export)]
pub enum NavigationDecision {
    Allow,
    Redirect { to: String },
}

/// SessionView
///
/// Output schema for `GET /api/session`: everything the frontend needs to draw
/// the shell for the current caller.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SessionView {
    pub authenticated: bool,
    pub role: Role,
    pub landing_path: String,
    pub menu: Vec<MenuEntry>,
}

/// PageView
///
/// What the console hands to the view renderer once a page request passed the
/// navigation guard.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct PageView {
    pub path: String,
    pub role: Role,
    pub menu: Vec<MenuEntry>,
}
