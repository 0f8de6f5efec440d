//! Error types shared across the console.
//!
//! None of these reach a navigation decision: resolution failures degrade to
//! the public role, and route mismatches are redirects.

/// Text that does not name a known role.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0:?}")]
pub struct RoleParseError(pub String);

/// Failures of the profile store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("profile store unavailable: {0}")]
    Unavailable(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("stored profile is corrupt: {0}")]
    CorruptRole(#[from] RoleParseError),

    #[error("profile store did not answer within {0:?}")]
    Timeout(std::time::Duration),
}

/// Problems found while loading or validating a route table.
#[derive(Debug, thiserror::Error)]
pub enum RouteTableError {
    #[error("failed to read route table {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse route table: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("route path must start with '/': {0}")]
    RelativePath(String),

    #[error("duplicate rule for path {0}")]
    DuplicateRule(String),

    #[error("home path {0} must be governed by a public rule")]
    PrivateHome(String),

    #[error("dashboard path {0} must be open to every signed-in role")]
    UnreachableDashboard(String),

    #[error("menu entry {label:?} points at {path}, which no rule governs")]
    UngovernedMenuEntry { label: String, path: String },
}
