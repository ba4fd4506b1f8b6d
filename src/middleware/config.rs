use axum_extra::extract::cookie::Key;
use url::Url;

use super::error::AuthError;
use crate::api::{BackendClient, BackendConfig};
#[cfg(feature = "google")]
use crate::google::{GoogleClient, GoogleConfig};

/// Shared auth settings used by both config and runtime state.
#[derive(Clone)]
pub(crate) struct AuthSettings {
    pub(crate) cookie_key: Key,
    pub(crate) session_cookie_name: String,
    pub(crate) session_ttl_days: i64,
    pub(crate) secure_cookies: bool,
    pub(crate) auth_path: String,
    pub(crate) login_path: String,
    pub(crate) login_redirect: String,
    pub(crate) logout_redirect: String,
    pub(crate) error_redirect: String,
}

impl AuthSettings {
    fn defaults() -> Self {
        Self {
            cookie_key: Key::generate(),
            session_cookie_name: "__minispod_session".into(),
            session_ttl_days: 30,
            secure_cookies: true,
            auth_path: "/auth".into(),
            login_path: "/auth/login".into(),
            login_redirect: "/dashboard".into(),
            logout_redirect: "/".into(),
            error_redirect: "/auth/login".into(),
        }
    }
}

/// MinisPod dashboard authentication configuration.
///
/// Required field (the backend client) is a constructor parameter — no
/// runtime "missing field" errors.
///
/// Use [`from_env()`](MinisPodAuthConfig::from_env) for convention-based
/// setup, or [`new()`](MinisPodAuthConfig::new) with `with_*` methods for
/// full control.
pub struct MinisPodAuthConfig {
    pub(super) api: BackendClient,
    #[cfg(feature = "google")]
    pub(super) google: Option<GoogleClient>,
    pub(super) settings: AuthSettings,
}

impl MinisPodAuthConfig {
    /// Create config with the required backend exchange client.
    #[must_use]
    pub fn new(api: BackendClient) -> Self {
        Self {
            api,
            #[cfg(feature = "google")]
            google: None,
            settings: AuthSettings::defaults(),
        }
    }

    /// Create config from environment variables.
    ///
    /// # Required env vars
    /// - `MINISPOD_API_URL`: base URL of the platform API
    ///
    /// # Optional env vars
    /// - `GOOGLE_CLIENT_ID` / `GOOGLE_CLIENT_SECRET` / `GOOGLE_REDIRECT_URI`:
    ///   set all three to enable Google sign-in
    /// - `COOKIE_KEY`: session-signing key bytes (>= 64 bytes)
    /// - `DEV_AUTH`: set to `"1"` or `"true"` to disable secure cookies
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if required vars are missing, URLs are
    /// invalid, or the Google trio is only partially set.
    pub fn from_env() -> Result<Self, AuthError> {
        let api_url_str = std::env::var("MINISPOD_API_URL")
            .map_err(|_| AuthError::Config("MINISPOD_API_URL is required".into()))?;
        let api_url: Url = api_url_str
            .parse()
            .map_err(|e| AuthError::Config(format!("MINISPOD_API_URL: {e}")))?;

        let dev_auth = matches!(std::env::var("DEV_AUTH").as_deref(), Ok("1") | Ok("true"));

        let cookie_key = match std::env::var("COOKIE_KEY") {
            Ok(k) => Key::try_from(k.as_bytes()).map_err(|_| {
                AuthError::Config(
                    "COOKIE_KEY is set but invalid (must be at least 64 bytes). \
                     Remove the env var to use an ephemeral key, or provide a valid key."
                        .into(),
                )
            })?,
            Err(_) => Key::generate(),
        };

        let config = Self::new(BackendClient::new(BackendConfig::new(api_url)))
            .with_cookie_key(cookie_key)
            .with_secure_cookies(!dev_auth);

        #[cfg(feature = "google")]
        let config = {
            let client_id = std::env::var("GOOGLE_CLIENT_ID").ok();
            let client_secret = std::env::var("GOOGLE_CLIENT_SECRET").ok();
            let redirect_uri = std::env::var("GOOGLE_REDIRECT_URI").ok();
            match (client_id, client_secret, redirect_uri) {
                (Some(id), Some(secret), Some(uri)) => {
                    let uri: Url = uri
                        .parse()
                        .map_err(|e| AuthError::Config(format!("GOOGLE_REDIRECT_URI: {e}")))?;
                    config.with_google(GoogleClient::new(GoogleConfig::new(id, secret, uri)))
                }
                (None, None, None) => config,
                _ => {
                    return Err(AuthError::Config(
                        "GOOGLE_CLIENT_ID, GOOGLE_CLIENT_SECRET and GOOGLE_REDIRECT_URI \
                         must be set together"
                            .into(),
                    ));
                }
            }
        };

        Ok(config)
    }

    /// Enable Google federated sign-in.
    #[cfg(feature = "google")]
    #[must_use]
    pub fn with_google(mut self, client: GoogleClient) -> Self {
        self.google = Some(client);
        self
    }

    #[must_use]
    pub fn with_cookie_key(mut self, key: Key) -> Self {
        self.settings.cookie_key = key;
        self
    }

    #[must_use]
    pub fn with_session_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.settings.session_cookie_name = name.into();
        self
    }

    #[must_use]
    pub fn with_session_ttl_days(mut self, days: i64) -> Self {
        self.settings.session_ttl_days = days;
        self
    }

    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.settings.secure_cookies = secure;
        self
    }

    /// Path prefix the auth routes mount under (default `/auth`).
    #[must_use]
    pub fn with_auth_path(mut self, path: impl Into<String>) -> Self {
        self.settings.auth_path = path.into();
        self
    }

    /// Login page the route guard redirects to (default `/auth/login`).
    #[must_use]
    pub fn with_login_path(mut self, path: impl Into<String>) -> Self {
        self.settings.login_path = path.into();
        self
    }

    /// Destination after a successful login (default `/dashboard`).
    #[must_use]
    pub fn with_login_redirect(mut self, path: impl Into<String>) -> Self {
        self.settings.login_redirect = path.into();
        self
    }

    #[must_use]
    pub fn with_logout_redirect(mut self, path: impl Into<String>) -> Self {
        self.settings.logout_redirect = path.into();
        self
    }

    /// Destination for OAuth flow failures (default `/auth/login`).
    #[must_use]
    pub fn with_error_redirect(mut self, path: impl Into<String>) -> Self {
        self.settings.error_redirect = path.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> MinisPodAuthConfig {
        let backend = BackendClient::new(BackendConfig::new(
            "http://127.0.0.1:9".parse().unwrap(),
        ));
        MinisPodAuthConfig::new(backend)
    }

    #[test]
    fn defaults_match_dashboard_conventions() {
        let config = test_config();
        assert_eq!(config.settings.session_cookie_name, "__minispod_session");
        assert_eq!(config.settings.auth_path, "/auth");
        assert_eq!(config.settings.login_path, "/auth/login");
        assert_eq!(config.settings.login_redirect, "/dashboard");
        assert_eq!(config.settings.session_ttl_days, 30);
        assert!(config.settings.secure_cookies);
    }

    #[test]
    fn builder_overrides_apply() {
        let config = test_config()
            .with_session_cookie_name("sid")
            .with_session_ttl_days(7)
            .with_secure_cookies(false)
            .with_login_redirect("/dashboard/home");
        assert_eq!(config.settings.session_cookie_name, "sid");
        assert_eq!(config.settings.session_ttl_days, 7);
        assert!(!config.settings.secure_cookies);
        assert_eq!(config.settings.login_redirect, "/dashboard/home");
    }
}
