use axum::extract::State;
use axum::response::Redirect;
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::PrivateCookieJar;
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use super::cookies;
use super::error::AuthError;
use super::extractor::resolve_session;
use super::state::AuthState;
use crate::api::Registration;
use crate::session::{CurrentUser, Session};

/// Create the dashboard authentication router.
///
/// Mounts under the configured auth path (default `/auth`): login, register,
/// session view, logout, and — when a Google client is configured — the
/// federated login/callback pair.
pub fn auth_routes(state: AuthState) -> Router {
    let auth_path = state.settings.auth_path.clone();

    #[allow(unused_mut)]
    let mut router = Router::new()
        .route(&format!("{auth_path}/login"), post(login))
        .route(&format!("{auth_path}/register"), post(register))
        .route(&format!("{auth_path}/session"), get(session_view))
        .route(&format!("{auth_path}/logout"), get(logout).post(logout));

    #[cfg(feature = "google")]
    if state.google.is_some() {
        router = router
            .route(&format!("{auth_path}/google/login"), get(google_login))
            .route(
                &format!("{auth_path}/google/callback"),
                get(google_callback),
            );
    }

    router.with_state(state)
}

fn mint_session_cookie(
    state: &AuthState,
    session: &Session,
) -> Result<axum_extra::extract::cookie::Cookie<'static>, AuthError> {
    let value = cookies::encode_session(session).map_err(|e| AuthError::Session(e.to_string()))?;
    Ok(cookies::session_cookie(
        &state.settings.session_cookie_name,
        &value,
        state.settings.session_ttl_days,
        state.settings.secure_cookies,
    ))
}

// ── Login ──────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct LoginRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Serialize)]
struct SessionResponse {
    success: bool,
    user: CurrentUser,
}

async fn login(
    State(state): State<AuthState>,
    jar: PrivateCookieJar,
    Json(body): Json<LoginRequest>,
) -> Result<(PrivateCookieJar, Json<SessionResponse>), AuthError> {
    let result = state
        .api
        .exchange_password(&body.email, &body.password)
        .await?;

    let session = Session::mint(
        &result,
        OffsetDateTime::now_utc(),
        Duration::days(state.settings.session_ttl_days),
    );
    let cookie = mint_session_cookie(&state, &session)?;

    tracing::info!(subject = %session.subject, "credential login successful");

    Ok((
        jar.add(cookie),
        Json(SessionResponse {
            success: true,
            user: session.current_user(),
        }),
    ))
}

// ── Register ───────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    confirm_password: String,
}

#[derive(Serialize)]
struct MessageResponse {
    success: bool,
    message: String,
}

async fn register(
    State(state): State<AuthState>,
    Json(body): Json<RegisterRequest>,
) -> Result<Json<MessageResponse>, AuthError> {
    let registration = Registration {
        name: body.name,
        email: body.email,
        password: body.password,
        confirm_password: body.confirm_password,
    };

    let message = state.api.register(&registration).await?;

    Ok(Json(MessageResponse {
        success: true,
        message: message.unwrap_or_else(|| "Registration successful".into()),
    }))
}

// ── Session view ───────────────────────────────────────────────────

#[derive(Serialize)]
struct SessionViewResponse {
    user: Option<CurrentUser>,
}

/// Client-side reader endpoint: the current user, or `null`.
///
/// Invalid and inactive sessions report `null` here so client-side layout
/// checks agree with the route guard's three redirect conditions.
async fn session_view(
    State(state): State<AuthState>,
    jar: PrivateCookieJar,
) -> Json<SessionViewResponse> {
    let resolved = resolve_session(&jar, &state.settings.session_cookie_name);
    let user = resolved
        .current_session()
        .filter(|s| s.is_valid() && s.is_active)
        .map(Session::current_user);
    Json(SessionViewResponse { user })
}

// ── Logout ─────────────────────────────────────────────────────────

/// Destroy the session. Idempotent: a second call is a no-op, not an error.
async fn logout(
    State(state): State<AuthState>,
    jar: PrivateCookieJar,
) -> (PrivateCookieJar, Redirect) {
    if jar.get(&state.settings.session_cookie_name).is_some() {
        tracing::info!("session destroyed");
    }
    let clear = cookies::clear_session_cookie(&state.settings.session_cookie_name);
    (
        jar.remove(clear),
        Redirect::to(&state.settings.logout_redirect),
    )
}

// ── Google federated login ─────────────────────────────────────────

#[cfg(feature = "google")]
async fn google_login(
    State(state): State<AuthState>,
    jar: PrivateCookieJar,
) -> Result<(PrivateCookieJar, Redirect), AuthError> {
    let google = state
        .google
        .as_ref()
        .ok_or_else(|| AuthError::Config("Google sign-in is not configured".into()))?;

    let auth_req = google.authorization_url();
    let (pkce_cookie, state_cookie) = cookies::oauth_cookies(
        &auth_req.code_verifier,
        &auth_req.state,
        state.settings.secure_cookies,
        &state.settings.auth_path,
    );

    let jar = jar.add(pkce_cookie).add(state_cookie);
    Ok((jar, Redirect::to(&auth_req.url)))
}

#[cfg(feature = "google")]
#[derive(Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[cfg(feature = "google")]
async fn google_callback(
    State(state): State<AuthState>,
    jar: PrivateCookieJar,
    axum::extract::Query(params): axum::extract::Query<CallbackParams>,
) -> Result<(PrivateCookieJar, Redirect), axum::response::Response> {
    use crate::google::IdClaims;

    let google = state.google.as_ref().ok_or_else(|| {
        login_error(&state.settings.error_redirect, "google_not_configured")
    })?;

    if let Some(error) = &params.error {
        let desc = params.error_description.as_deref().unwrap_or("Unknown error");
        tracing::warn!(error = %error, description = %desc, "OAuth2 error from Google");
        return Err(login_error(&state.settings.error_redirect, desc));
    }

    let code = params
        .code
        .ok_or_else(|| login_error(&state.settings.error_redirect, "missing_code"))?;

    let received_state = params
        .state
        .ok_or_else(|| login_error(&state.settings.error_redirect, "state_mismatch"))?;

    let stored_state = cookies::get_oauth_state(&jar)
        .ok_or_else(|| login_error(&state.settings.error_redirect, "state_mismatch"))?;

    if received_state != stored_state {
        tracing::warn!("OAuth state mismatch");
        return Err(login_error(&state.settings.error_redirect, "state_mismatch"));
    }

    let code_verifier = cookies::get_code_verifier(&jar)
        .ok_or_else(|| login_error(&state.settings.error_redirect, "missing_verifier"))?;

    let tokens = google
        .exchange_code(&code, &code_verifier)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Google token exchange failed");
            login_error(&state.settings.error_redirect, "token_exchange_failed")
        })?;

    let claims = IdClaims::decode_unverified(&tokens.id_token).map_err(|e| {
        tracing::error!(error = %e, "Google ID token could not be decoded");
        login_error(&state.settings.error_redirect, "invalid_id_token")
    })?;

    // Never blocks sign-in: a failed backend sync degrades to USER/active.
    let result = state
        .api
        .exchange_federated_token(&tokens.id_token, &claims)
        .await;

    let session = Session::mint(
        &result,
        OffsetDateTime::now_utc(),
        Duration::days(state.settings.session_ttl_days),
    )
    .with_federated_access_token(tokens.access_token);

    let session_cookie = mint_session_cookie(&state, &session).map_err(|e| {
        tracing::error!(error = %e, "session cookie could not be minted");
        login_error(&state.settings.error_redirect, "session_failed")
    })?;

    let (clear_pkce, clear_state) = cookies::clear_oauth_cookies(&state.settings.auth_path);
    let jar = jar.add(session_cookie).add(clear_pkce).add(clear_state);

    tracing::info!(
        subject = %session.subject,
        degraded = result.degraded,
        "Google login successful"
    );

    Ok((jar, Redirect::to(&state.settings.login_redirect)))
}

// ── Helpers ────────────────────────────────────────────────────────

#[cfg(feature = "google")]
fn login_error(error_redirect: &str, code: &str) -> axum::response::Response {
    use axum::response::IntoResponse;
    let encoded = urlencoding::encode(code);
    Redirect::to(&format!("{error_redirect}?error={encoded}")).into_response()
}
