use std::sync::Arc;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;

use super::config::{AuthSettings, MinisPodAuthConfig};
use crate::api::BackendClient;
#[cfg(feature = "google")]
use crate::google::GoogleClient;

/// Shared state for the auth routes and the route guard.
///
/// Cheap to clone; embed it in (or `FromRef` it out of) the application
/// state so `RequireSession` works in dashboard handlers.
#[derive(Clone)]
pub struct AuthState {
    pub(super) api: Arc<BackendClient>,
    #[cfg(feature = "google")]
    pub(super) google: Option<Arc<GoogleClient>>,
    pub(super) settings: AuthSettings,
}

impl AuthState {
    #[must_use]
    pub fn new(config: MinisPodAuthConfig) -> Self {
        Self {
            api: Arc::new(config.api),
            #[cfg(feature = "google")]
            google: config.google.map(Arc::new),
            settings: config.settings,
        }
    }

    /// The credential exchange client, for consumers proxying platform calls.
    #[must_use]
    pub fn api(&self) -> &BackendClient {
        &self.api
    }

    /// Name of the session cookie.
    #[must_use]
    pub fn session_cookie_name(&self) -> &str {
        &self.settings.session_cookie_name
    }
}

// PrivateCookieJar requires Key to be extractable from state
impl FromRef<AuthState> for Key {
    fn from_ref(state: &AuthState) -> Self {
        state.settings.cookie_key.clone()
    }
}
