use axum_extra::extract::cookie::{Cookie, SameSite};
use time::Duration;

use crate::session::Session;

#[cfg(feature = "google")]
const PKCE_COOKIE_NAME: &str = "__minispod_pkce";
#[cfg(feature = "google")]
const STATE_COOKIE_NAME: &str = "__minispod_state";

/// Serialize a session for the private jar.
pub(super) fn encode_session(session: &Session) -> Result<String, serde_json::Error> {
    serde_json::to_string(session)
}

/// Decode a session cookie value; tampered or stale blobs read as no session.
pub(super) fn decode_session(value: &str) -> Option<Session> {
    match serde_json::from_str(value) {
        Ok(session) => Some(session),
        Err(e) => {
            tracing::warn!(error = %e, "undecodable session cookie, treating as anonymous");
            None
        }
    }
}

/// Create the session cookie.
pub(super) fn session_cookie(
    name: &str,
    value: &str,
    ttl_days: i64,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((name.to_string(), value.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/".to_string())
        .max_age(Duration::days(ttl_days))
        .build()
}

/// Create removal cookie for the session.
pub(super) fn clear_session_cookie(name: &str) -> Cookie<'static> {
    Cookie::build((name.to_string(), ""))
        .path("/".to_string())
        .max_age(Duration::ZERO)
        .build()
}

/// Create PKCE verifier + state cookies for the authorization request.
#[cfg(feature = "google")]
pub(super) fn oauth_cookies(
    code_verifier: &str,
    state: &str,
    secure: bool,
    auth_path: &str,
) -> (Cookie<'static>, Cookie<'static>) {
    let verifier = Cookie::build((PKCE_COOKIE_NAME, code_verifier.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path(auth_path.to_string())
        .max_age(Duration::minutes(5))
        .build();

    let state = Cookie::build((STATE_COOKIE_NAME, state.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path(auth_path.to_string())
        .max_age(Duration::minutes(5))
        .build();

    (verifier, state)
}

/// Create removal cookies for PKCE verifier + state.
#[cfg(feature = "google")]
pub(super) fn clear_oauth_cookies(auth_path: &str) -> (Cookie<'static>, Cookie<'static>) {
    let verifier = Cookie::build((PKCE_COOKIE_NAME, ""))
        .path(auth_path.to_string())
        .max_age(Duration::ZERO)
        .build();

    let state = Cookie::build((STATE_COOKIE_NAME, ""))
        .path(auth_path.to_string())
        .max_age(Duration::ZERO)
        .build();

    (verifier, state)
}

/// Get the PKCE verifier from cookies.
#[cfg(feature = "google")]
pub(super) fn get_code_verifier(jar: &axum_extra::extract::PrivateCookieJar) -> Option<String> {
    jar.get(PKCE_COOKIE_NAME).map(|c| c.value().to_string())
}

/// Get the OAuth state from cookies.
#[cfg(feature = "google")]
pub(super) fn get_oauth_state(jar: &axum_extra::extract::PrivateCookieJar) -> Option<String> {
    jar.get(STATE_COOKIE_NAME).map(|c| c.value().to_string())
}
