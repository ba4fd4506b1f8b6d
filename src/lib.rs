#![doc = include_str!("../README.md")]

pub mod api;
pub mod error;
#[cfg(feature = "google")]
pub mod google;
pub mod middleware;
pub mod session;
pub mod types;

// Re-exports for convenient access
pub use api::{
    AccountRecord, BackendClient, BackendConfig, ExchangeError, ExchangeResult, FieldError,
    Registration, TokenPair,
};
pub use error::Error;
#[cfg(feature = "google")]
pub use google::{GoogleClient, GoogleConfig, GoogleTokens, IdClaims};
pub use middleware::{
    AuthError, AuthState, CurrentSession, MinisPodAuthConfig, RequireSession, auth_routes,
    authorize, classify, resolve_session, session_guard,
};
pub use session::{CurrentUser, Role, Session, SessionState};
pub use types::{AccessToken, RefreshToken, SubjectId};
