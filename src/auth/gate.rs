use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use super::{
    classify::{RouteClassification, classify},
    policy::{Denial, authorize},
    session::{Identity, SessionState},
};

/// Where anonymous callers are sent.
pub const LOGIN_PATH: &str = "/login";

/// Where signed-in callers without the right role are sent. Never the login page.
pub const LANDING_PATH: &str = "/today";

/// Query parameter carrying the originally requested target on the login redirect.
pub const CALLBACK_PARAM: &str = "callbackUrl";

/// GateDecision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    RedirectTo(String),
}

/// decide
///
/// Maps the shared `authorize` policy onto redirects. `target` is what the caller asked
/// for (path, plus query when there is one) and ends up in the login callback.
pub fn decide(
    target: &str,
    classification: RouteClassification,
    identity: Option<&Identity>,
) -> GateDecision {
    match authorize(classification.required_access(), identity) {
        Ok(()) => GateDecision::Allow,
        Err(Denial::Unauthenticated) => GateDecision::RedirectTo(login_redirect(target)),
        Err(Denial::RoleMismatch) => GateDecision::RedirectTo(LANDING_PATH.to_string()),
    }
}

/// `/login?callbackUrl=<percent-encoded target>`
pub fn login_redirect(target: &str) -> String {
    format!(
        "{LOGIN_PATH}?{CALLBACK_PARAM}={}",
        urlencoding::encode(target)
    )
}

/// enforce
///
/// Router-wide middleware run before any handler. Public paths pass through without
/// touching the credential; protected paths are resolved and decided.
pub async fn enforce(
    State(sessions): State<SessionState>,
    request: Request,
    next: Next,
) -> Response {
    let uri = request.uri();
    let classification = classify(uri.path());
    if !classification.protected {
        return next.run(request).await;
    }

    let target = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    let identity = sessions.resolve(request.headers());

    match decide(target, classification, identity.as_ref()) {
        GateDecision::Allow => next.run(request).await,
        GateDecision::RedirectTo(location) => {
            tracing::info!(
                event = "gate_redirect",
                path = %uri.path(),
                location = %location,
                user_id = ?identity.map(|i| i.subject_id),
                role = ?identity.map(|i| i.role),
                "request redirected by gate"
            );
            Redirect::to(&location).into_response()
        }
    }
}
