//! Plug-and-play dashboard authentication for Axum.
//!
//! This module wires the credential exchange client, the session issuer and
//! the route guard into mountable routes and middleware for the MinisPod
//! dashboard server.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use minispod_auth::middleware::{auth_routes, session_guard, AuthState, MinisPodAuthConfig};
//!
//! // 1. Configure from environment
//! let state = AuthState::new(MinisPodAuthConfig::from_env()?);
//!
//! // 2. Mount auth routes and guard the dashboard namespace
//! let app = axum::Router::new()
//!     .merge(auth_routes(state.clone()))
//!     .nest("/dashboard", dashboard_router
//!         .layer(axum::middleware::from_fn_with_state(state.clone(), session_guard)));
//!
//! // 3. Use RequireSession / CurrentSession in handlers
//! ```

mod config;
mod cookies;
mod error;
mod extractor;
mod guard;
mod routes;
mod state;

pub use config::MinisPodAuthConfig;
pub use error::AuthError;
pub use extractor::{CurrentSession, RequireSession, resolve_session};
pub use guard::{
    DASHBOARD_PREFIX, Decision, RouteClass, authorize, classify, session_guard,
};
pub use routes::auth_routes;
pub use state::AuthState;

/// Re-export cookie key type for builder API.
pub use axum_extra::extract::cookie::Key as CookieKey;
