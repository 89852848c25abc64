use axum::extract::{RawPathParams, Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::policy::{self, PolicyInput, Who};
use crate::state::AppState;

/// Layer state for one protected route: the shared app state, the
/// `domain.action` rule, and the who-flags the route grants.
pub type AuthState = (AppState, &'static str, u8);

pub fn auth_state(state: &AppState, rule: &'static str, who: &[Who]) -> AuthState {
    (state.clone(), rule, policy::flags(who))
}

/// Bearer-JWT check followed by policy evaluation. The token must verify
/// against the service's verifier; the policy sees
/// `(domain, action, who_flags, object, claims)` with the `:user` path
/// parameter as the object.
pub async fn authorize(
    State((state, rule, who_flags)): State<AuthState>,
    params: RawPathParams,
    req: Request,
    next: Next,
) -> Response {
    let (domain, action) = rule.split_once('.').unwrap_or((rule, ""));

    let token = match bearer_token(&req) {
        Some(token) => token,
        None => {
            return unauthorized(
                StatusCode::UNAUTHORIZED,
                "invalid authorization header format",
            )
        }
    };

    let claims = match state.verifier.verify(token).await {
        Ok(claims) => claims,
        Err(e) => return unauthorized(StatusCode::UNAUTHORIZED, &e.to_string()),
    };

    let object = params
        .iter()
        .find(|(name, _)| *name == "user")
        .map(|(_, value)| value.to_string());

    let input = PolicyInput {
        domain: domain.to_string(),
        action: action.to_string(),
        who_flags,
        object,
        claims,
    };

    match state.policy.eval(&input).await {
        Ok(true) => next.run(req).await,
        Ok(false) => unauthorized(StatusCode::FORBIDDEN, "access denied"),
        Err(e) => unauthorized(StatusCode::EXPECTATION_FAILED, &e.to_string()),
    }
}

fn bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

fn unauthorized(status: StatusCode, reason: &str) -> Response {
    (
        status,
        [(header::WWW_AUTHENTICATE, "Bearer realm=wallet")],
        reason.to_string(),
    )
        .into_response()
}
