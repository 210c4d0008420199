use super::session::Identity;
use crate::models::Role;

/// Access
///
/// The requirement a route places on the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Anyone, signed in or not.
    Public,
    /// Any signed-in user.
    Authenticated,
    /// Signed-in users with the admin role.
    Admin,
    /// Signed-in users with the client role.
    Client,
}

/// Denial
///
/// Why `authorize` refused a request. Each enforcement point decides how to present it:
/// the edge gate redirects, handler guards answer with a JSON error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// No valid session.
    Unauthenticated,
    /// A valid session whose role does not satisfy the route.
    RoleMismatch,
}

/// authorize
///
/// The single authorization policy shared by the gate middleware and every handler guard.
/// Authentication is checked before role, so anonymous callers are never told that a
/// route is role-restricted.
pub fn authorize(access: Access, identity: Option<&Identity>) -> Result<(), Denial> {
    let required_role = match access {
        Access::Public => return Ok(()),
        Access::Authenticated => None,
        Access::Admin => Some(Role::Admin),
        Access::Client => Some(Role::Client),
    };

    let identity = identity.ok_or(Denial::Unauthenticated)?;

    match required_role {
        Some(role) if identity.role != role => Err(Denial::RoleMismatch),
        _ => Ok(()),
    }
}
