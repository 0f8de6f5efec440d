/// Router Module Index
///
/// Splits the console's routing by access tier. JSON API routes are nested under
/// `/api`; everything else is a console page decided by the route table.

/// API routes open to every caller. Their answers depend on the caller's role,
/// but none of them reject a public caller.
pub mod public;

/// API routes behind the `AuthUser` extractor middleware (`401` for public callers).
pub mod authenticated;

/// Page routes: a catch-all guarded by the route table, redirecting instead of
/// ever returning `403`.
pub mod console;
