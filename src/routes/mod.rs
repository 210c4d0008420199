/// Router Module Index
///
/// Routes grouped by who may call them. The gate middleware in `create_router` wraps
/// every group; API handlers additionally carry their own guard extractors.

/// Routes open to anonymous callers.
pub mod public;

/// Gated pages and API routes for any signed-in user.
pub mod authenticated;

/// Gated pages and API routes for admins only.
pub mod admin;
