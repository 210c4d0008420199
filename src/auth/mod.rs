//! Auth Module Index
//!
//! Everything that decides who may reach which route: path classification, token
//! issuing and verification, the shared authorization policy, and the two places it
//! is enforced (the router-wide gate and handler guards).

/// Static prefix table and path classification.
pub mod classify;
/// The edge gate: decision function and router-wide middleware.
pub mod gate;
/// Handler-level guard extractors.
pub mod guard;
/// Argon2 password hashing for the credential issuer.
pub mod password;
/// The single authorization policy.
pub mod policy;
/// Signed session tokens and the lightweight resolver.
pub mod session;
/// The database-backed resolver used inside handlers.
pub mod user;

pub use classify::{RouteClassification, classify};
pub use gate::{GateDecision, LANDING_PATH, LOGIN_PATH, decide};
pub use guard::{MaybeIdentity, RequireAdmin, RequireAuth, RequireClient};
pub use policy::{Access, Denial, authorize};
pub use session::{Claims, Identity, SessionError, SessionKeys, SessionState};
pub use user::AuthUser;
