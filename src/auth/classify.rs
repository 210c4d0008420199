use super::policy::Access;

/// Top-level path segments that require a signed-in user.
pub const CLIENT_PREFIXES: [&str; 9] = [
    "today",
    "dashboard",
    "results",
    "programs",
    "progress",
    "account",
    "tasks",
    "inbox",
    "coaching",
];

/// Top-level path segment reserved for admins. Also protected.
pub const ADMIN_PREFIX: &str = "admin";

/// RouteClassification
///
/// What the gate needs to know about a path. `admin_only` implies `protected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RouteClassification {
    pub protected: bool,
    pub admin_only: bool,
}

impl RouteClassification {
    /// The access level a request to this route must satisfy.
    pub fn required_access(&self) -> Access {
        if self.admin_only {
            Access::Admin
        } else if self.protected {
            Access::Authenticated
        } else {
            Access::Public
        }
    }
}

/// classify
///
/// Pure and total. A path matches a prefix when it is exactly `/<prefix>` or
/// continues with `/`, so `/adminx` and `/todayish` stay public. Anything that
/// does not start with `/` is public too.
pub fn classify(path: &str) -> RouteClassification {
    let admin_only = matches_prefix(path, ADMIN_PREFIX);
    let protected = admin_only || CLIENT_PREFIXES.iter().any(|p| matches_prefix(path, p));
    RouteClassification {
        protected,
        admin_only,
    }
}

fn matches_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix('/').and_then(|rest| rest.strip_prefix(prefix)) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}
