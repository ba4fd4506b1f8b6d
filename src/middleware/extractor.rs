use std::convert::Infallible;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::PrivateCookieJar;

use super::cookies;
use super::guard::{Decision, authorize};
use super::state::AuthState;
use crate::session::{Session, SessionState};

/// Resolve the session state from the private jar.
///
/// No cookie reads as `Anonymous`; a cookie that fails to decode also reads
/// as `Anonymous` (tampering or a stale format). The session is returned as
/// stored — invalid or inactive sessions are the guard's problem.
#[must_use]
pub fn resolve_session(jar: &PrivateCookieJar, cookie_name: &str) -> SessionState {
    match jar.get(cookie_name) {
        None => SessionState::Anonymous,
        Some(cookie) => match cookies::decode_session(cookie.value()) {
            Some(session) => SessionState::Authenticated(session),
            None => SessionState::Anonymous,
        },
    }
}

/// Read-only session view for any handler.
///
/// Infallible: handlers outside the guarded router observe
/// [`SessionState::Unresolved`] and must treat it as "not known yet", not as
/// "no session" — do not redirect on it.
///
/// ```rust,ignore
/// async fn navbar(CurrentSession(state): CurrentSession) -> impl IntoResponse {
///     match state.current_user() {
///         Some(user) => format!("Hello, {}", user.name),
///         None => "Hello, guest".to_string(),
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentSession(pub SessionState);

impl<S: Send + Sync> FromRequestParts<S> for CurrentSession {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(
            parts
                .extensions
                .get::<SessionState>()
                .cloned()
                .unwrap_or_default(),
        ))
    }
}

/// Defensive in-handler session requirement for dashboard handlers.
///
/// Applies the exact same [`authorize`] decision as the
/// [`session_guard`](super::guard::session_guard) middleware; if the
/// middleware was not mounted (or raced), this layer still redirects on the
/// same three conditions (absent / invalid / inactive).
#[derive(Debug, Clone)]
pub struct RequireSession(pub Session);

impl<S> FromRequestParts<S> for RequireSession
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = AuthState::from_ref(state);

        let session_state = match parts.extensions.get::<SessionState>() {
            Some(resolved) => resolved.clone(),
            // Guard middleware did not run for this route: resolve here.
            None => match PrivateCookieJar::from_request_parts(parts, &auth).await {
                Ok(jar) => resolve_session(&jar, &auth.settings.session_cookie_name),
                Err(never) => match never {},
            },
        };

        let redirect =
            || Redirect::to(&auth.settings.login_path).into_response();

        match authorize(session_state.current_session(), parts.uri.path()) {
            Decision::RedirectToLogin => Err(redirect()),
            Decision::Allow => match session_state {
                SessionState::Authenticated(session) => Ok(Self(session)),
                // Allowed public path but the handler demands a session.
                _ => Err(redirect()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{AccountRecord, ExchangeResult};
    use crate::session::Role;
    use time::{Duration, OffsetDateTime};

    fn session() -> Session {
        let result = ExchangeResult {
            user: AccountRecord {
                id: "u1".into(),
                email: "a@b.com".into(),
                name: "A".into(),
                role: Role::User,
                is_active: true,
            },
            tokens: None,
            degraded: false,
        };
        Session::mint(&result, OffsetDateTime::now_utc(), Duration::days(30))
    }

    #[test]
    fn unresolved_is_the_default_state() {
        let state = SessionState::default();
        assert!(!state.is_resolved());
        assert!(state.current_session().is_none());
    }

    #[test]
    fn current_session_reads_stored_session_as_is() {
        let mut s = session();
        s.is_active = false;
        let state = SessionState::Authenticated(s);
        // The reader exposes the session unchanged; only authorize() demotes it.
        assert!(state.current_session().is_some());
        assert_eq!(
            authorize(state.current_session(), "/dashboard"),
            Decision::RedirectToLogin
        );
    }
}
