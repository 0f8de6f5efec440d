use serde::{Deserialize, Serialize};
use std::{collections::HashSet, path::Path, sync::Arc};

use crate::{
    error::RouteTableError,
    models::{MenuEntry, NavigationDecision, Role, RouteAccess, RouteRule},
};

/// RouteTable
///
/// The static access configuration of the console: which roles may view which
/// paths, where each kind of session lands, and the ordered side menu.
///
/// Loaded once at start and never mutated, so every check below is a pure
/// function safe to call from any number of readers without locking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteTable {
    pub home_path: String,
    pub dashboard_path: String,
    pub rules: Vec<RouteRule>,
    #[serde(default)]
    pub menu: Vec<MenuEntry>,
}

/// RouteTableState
///
/// The shared, read-only handle stored in the application state.
pub type RouteTableState = Arc<RouteTable>;

impl Default for RouteTable {
    /// The fire-safety console layout: marketing pages are public, the
    /// dashboard is open to every signed-in role, and each business area is
    /// limited to the teams that work in it.
    fn default() -> Self {
        use RouteAccess::{Authenticated, Public, Roles};

        Self {
            home_path: "/".to_string(),
            dashboard_path: "/dashboard".to_string(),
            rules: vec![
                RouteRule::new("/", Public),
                RouteRule::new("/services", Public),
                RouteRule::new("/about", Public),
                RouteRule::new("/contact", Public),
                RouteRule::new("/login", Public),
                RouteRule::new("/dashboard", Authenticated),
                RouteRule::new("/profile", Authenticated),
                RouteRule::new("/contracts", Roles(vec![Role::Admin, Role::Sales])),
                RouteRule::new(
                    "/work-orders",
                    Roles(vec![Role::Admin, Role::Operations, Role::Technician]),
                ),
                RouteRule::new("/inventory", Roles(vec![Role::Admin, Role::Technician])),
                RouteRule::new("/accounting", Roles(vec![Role::Admin, Role::Accounts])),
                RouteRule::new("/team", Roles(vec![Role::Admin])),
                RouteRule::new("/portal", Roles(vec![Role::Client, Role::Admin])),
            ],
            menu: vec![
                MenuEntry::new("Dashboard", "/dashboard"),
                MenuEntry::new("Contracts", "/contracts"),
                MenuEntry::new("Work Orders", "/work-orders"),
                MenuEntry::new("Inventory", "/inventory"),
                MenuEntry::new("Accounting", "/accounting"),
                MenuEntry::new("Team", "/team"),
                MenuEntry::new("Client Portal", "/portal"),
                MenuEntry::new("Profile", "/profile"),
            ],
        }
    }
}

impl RouteTable {
    /// Parses and validates a JSON route table.
    pub fn from_json_str(raw: &str) -> Result<Self, RouteTableError> {
        let table: RouteTable = serde_json::from_str(raw)?;
        table.validate()?;
        Ok(table)
    }

    /// Reads a JSON route table from disk. Used once at process start.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RouteTableError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| RouteTableError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// validate
    ///
    /// Rejects tables the resolver could not honour: relative or duplicate rule
    /// paths, a home page that public sessions could not reach, a dashboard
    /// that some signed-in role could not reach (either would turn a redirect
    /// into a loop), and menu entries with no rule.
    pub fn validate(&self) -> Result<(), RouteTableError> {
        let mut seen = HashSet::new();
        for rule in &self.rules {
            if !rule.path.starts_with('/') {
                return Err(RouteTableError::RelativePath(rule.path.clone()));
            }
            if !seen.insert(normalize(&rule.path)) {
                return Err(RouteTableError::DuplicateRule(rule.path.clone()));
            }
        }

        if !self.can_access(Role::Public, &self.home_path) {
            return Err(RouteTableError::PrivateHome(self.home_path.clone()));
        }

        let dashboard_open = self.dashboard_path.starts_with('/')
            && Role::ALL
                .iter()
                .filter(|role| role.is_authenticated())
                .all(|role| self.can_access(*role, &self.dashboard_path));
        if !dashboard_open {
            return Err(RouteTableError::UnreachableDashboard(
                self.dashboard_path.clone(),
            ));
        }

        if let Some(entry) = self
            .menu
            .iter()
            .find(|entry| self.rule_for(&entry.path).is_none())
        {
            return Err(RouteTableError::UngovernedMenuEntry {
                label: entry.label.clone(),
                path: entry.path.clone(),
            });
        }

        Ok(())
    }

    /// rule_for
    ///
    /// Finds the rule governing `path`: an exact match wins, otherwise the
    /// longest rule that is a whole-segment prefix (`/work-orders` governs
    /// `/work-orders/42` but not `/work-orders-archive`). The root rule only
    /// governs `/` itself.
    pub fn rule_for(&self, path: &str) -> Option<&RouteRule> {
        let path = normalize(path);

        if let Some(exact) = self.rules.iter().find(|rule| normalize(&rule.path) == path) {
            return Some(exact);
        }

        self.rules
            .iter()
            .filter(|rule| {
                let prefix = normalize(&rule.path);
                prefix != "/"
                    && path
                        .strip_prefix(prefix)
                        .is_some_and(|rest| rest.starts_with('/'))
            })
            .max_by_key(|rule| normalize(&rule.path).len())
    }

    /// True iff the rule governing `path` admits `role`. Paths without a rule
    /// are closed to everyone.
    pub fn can_access(&self, role: Role, path: &str) -> bool {
        self.rule_for(path)
            .is_some_and(|rule| rule.access.permits(role))
    }

    /// Public sessions land on the marketing home; every signed-in role lands on
    /// the dashboard.
    pub fn default_landing_path(&self, role: Role) -> &str {
        if role.is_authenticated() {
            &self.dashboard_path
        } else {
            &self.home_path
        }
    }

    /// The menu entries `role` may open, in table order.
    pub fn visible_menu_items(&self, role: Role) -> Vec<MenuEntry> {
        self.menu
            .iter()
            .filter(|entry| self.can_access(role, &entry.path))
            .cloned()
            .collect()
    }

    /// navigate
    ///
    /// Decides a page request. Denied requests are redirected to the caller's
    /// landing path and recorded, so refused attempts leave an audit trail.
    pub fn navigate(&self, role: Role, path: &str) -> NavigationDecision {
        if self.can_access(role, path) {
            return NavigationDecision::Allow;
        }

        let to = self.default_landing_path(role).to_string();
        tracing::info!(%role, path, redirect_to = %to, "navigation denied; redirecting");
        NavigationDecision::Redirect { to }
    }
}

/// Strips trailing slashes so `/inventory/` and `/inventory` match the same rule.
fn normalize(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() { "/" } else { trimmed }
}
