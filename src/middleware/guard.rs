//! The route guard: one pure decision, two enforcement layers.
//!
//! [`authorize`] is the single source of truth for allow/redirect. The
//! [`session_guard`] middleware applies it per request; the
//! [`RequireSession`](super::extractor::RequireSession) extractor applies
//! the same function defensively inside handlers, so the layers cannot
//! disagree.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::PrivateCookieJar;
use time::{Duration, OffsetDateTime};

use super::cookies;
use super::extractor::resolve_session;
use super::state::AuthState;
use crate::session::{Session, SessionState};

/// Everything under this prefix requires a valid, active session.
pub const DASHBOARD_PREFIX: &str = "/dashboard";

/// Static, prefix-based classification of a requestable path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    Public,
    Protected,
}

/// Classify a path. Protected iff it is the dashboard namespace or below;
/// the root, auth pages and the OAuth callback all fall out as public.
#[must_use]
pub fn classify(path: &str) -> RouteClass {
    match path.strip_prefix(DASHBOARD_PREFIX) {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => RouteClass::Protected,
        _ => RouteClass::Public,
    }
}

/// Outcome of an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    RedirectToLogin,
}

/// The authorization decision, shared by middleware and extractor.
///
/// Public paths are allowed unconditionally. Protected paths redirect when
/// the session is absent, invalid, or belongs to a deactivated account —
/// the latter two are treated identically to no session, never advisory.
#[must_use]
pub fn authorize(session: Option<&Session>, path: &str) -> Decision {
    if classify(path) == RouteClass::Public {
        return Decision::Allow;
    }
    match session {
        None => Decision::RedirectToLogin,
        Some(s) if !s.is_valid() => Decision::RedirectToLogin,
        Some(s) if !s.is_active => Decision::RedirectToLogin,
        Some(_) => Decision::Allow,
    }
}

/// Request-level route guard.
///
/// Resolves the session from the private jar, runs the refresh checkpoint,
/// stores the [`SessionState`] in request extensions for handlers, and
/// either forwards the request or redirects to the login path. Never errors:
/// every disallowed case resolves to a redirect.
pub async fn session_guard(
    State(state): State<AuthState>,
    jar: PrivateCookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let now = OffsetDateTime::now_utc();
    let ttl = Duration::days(state.settings.session_ttl_days);

    let session_state = match resolve_session(&jar, &state.settings.session_cookie_name) {
        SessionState::Authenticated(session) => {
            SessionState::Authenticated(session.refreshed(now, ttl))
        }
        other => other,
    };

    let path = request.uri().path().to_owned();
    match authorize(session_state.current_session(), &path) {
        Decision::RedirectToLogin => {
            tracing::debug!(%path, "route guard redirecting to login");
            Redirect::to(&state.settings.login_path).into_response()
        }
        Decision::Allow => {
            // Rolling expiry: re-mint the cookie for a still-valid session.
            // An invalidated blob stays in place until explicit sign-out.
            let refreshed_cookie = match &session_state {
                SessionState::Authenticated(session) if session.is_valid_at(now) => {
                    match cookies::encode_session(session) {
                        Ok(value) => Some(cookies::session_cookie(
                            &state.settings.session_cookie_name,
                            &value,
                            state.settings.session_ttl_days,
                            state.settings.secure_cookies,
                        )),
                        Err(e) => {
                            tracing::warn!(error = %e, "session re-mint failed, keeping prior cookie");
                            None
                        }
                    }
                }
                _ => None,
            };

            request.extensions_mut().insert(session_state);
            let response = next.run(request).await;
            match refreshed_cookie {
                Some(cookie) => (jar.add(cookie), response).into_response(),
                None => response,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{AccountRecord, ExchangeResult, TokenPair};
    use crate::session::Role;

    fn session() -> Session {
        let result = ExchangeResult {
            user: AccountRecord {
                id: "u1".into(),
                email: "a@b.com".into(),
                name: "A".into(),
                role: Role::User,
                is_active: true,
            },
            tokens: Some(TokenPair {
                access_token: "t1".to_string().into(),
                refresh_token: "r1".to_string().into(),
            }),
            degraded: false,
        };
        Session::mint(&result, OffsetDateTime::now_utc(), Duration::days(30))
    }

    #[test]
    fn classification_is_prefix_based() {
        assert_eq!(classify("/"), RouteClass::Public);
        assert_eq!(classify("/auth/login"), RouteClass::Public);
        assert_eq!(classify("/auth/google/callback"), RouteClass::Public);
        assert_eq!(classify("/dashboard"), RouteClass::Protected);
        assert_eq!(classify("/dashboard/billing"), RouteClass::Protected);
        assert_eq!(classify("/dashboard/workers/w-1"), RouteClass::Protected);
        // Prefix means path segments, not string prefix.
        assert_eq!(classify("/dashboardish"), RouteClass::Public);
    }

    #[test]
    fn protected_path_without_session_redirects() {
        assert_eq!(
            authorize(None, "/dashboard/billing"),
            Decision::RedirectToLogin
        );
    }

    #[test]
    fn protected_path_with_valid_session_allows() {
        let s = session();
        assert_eq!(authorize(Some(&s), "/dashboard/billing"), Decision::Allow);
    }

    #[test]
    fn invalid_session_is_treated_as_logged_out() {
        let mut s = session();
        s.valid = false;
        assert_eq!(
            authorize(Some(&s), "/dashboard"),
            Decision::RedirectToLogin
        );
    }

    #[test]
    fn inactive_account_redirects_regardless_of_validity() {
        let mut s = session();
        s.is_active = false;
        assert!(s.valid, "validity flag alone does not save an inactive account");
        assert_eq!(
            authorize(Some(&s), "/dashboard/billing"),
            Decision::RedirectToLogin
        );
    }

    #[test]
    fn public_paths_allow_any_session_state() {
        let mut inactive = session();
        inactive.is_active = false;

        assert_eq!(authorize(None, "/auth/login"), Decision::Allow);
        assert_eq!(authorize(Some(&inactive), "/auth/login"), Decision::Allow);
        assert_eq!(authorize(None, "/"), Decision::Allow);
        assert_eq!(authorize(Some(&session()), "/auth/register"), Decision::Allow);
    }

    #[test]
    fn expired_session_redirects_on_protected_paths() {
        let now = OffsetDateTime::now_utc();
        let expired = session().refreshed(now + Duration::days(60), Duration::days(30));
        assert_eq!(
            authorize(Some(&expired), "/dashboard"),
            Decision::RedirectToLogin
        );
    }
}
