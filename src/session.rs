//! The session model: what the browser holds between requests.
//!
//! A [`Session`] is minted from an [`ExchangeResult`] at login, serialized
//! into the private (signed + encrypted) cookie, and re-derived on every
//! request by the route guard. It is the only quasi-shared state in the
//! dashboard: many readers, one writer (login, refresh checkpoint, logout).

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::{Duration, OffsetDateTime};

use crate::api::ExchangeResult;
use crate::types::{AccessToken, RefreshToken, SubjectId};

/// Account role as reported by the platform API.
///
/// Open set: roles the dashboard does not know yet must round-trip without
/// crashing, so unknown strings are carried verbatim in [`Role::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Role {
    User,
    Administrator,
    Other(String),
}

impl Role {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::User => "USER",
            Self::Administrator => "ADMINISTRATOR",
            Self::Other(s) => s,
        }
    }

    #[must_use]
    pub fn is_administrator(&self) -> bool {
        matches!(self, Self::Administrator)
    }
}

impl Default for Role {
    fn default() -> Self {
        Self::User
    }
}

impl From<&str> for Role {
    fn from(s: &str) -> Self {
        match s {
            "USER" => Self::User,
            "ADMINISTRATOR" => Self::Administrator,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::from)
    }
}

/// The browser-held record of an authenticated user.
///
/// Minted once per login and re-minted at every request checkpoint. A session
/// with `valid == false` or `is_active == false` must be treated identically
/// to no session by the route guard; the blob itself is only deleted by an
/// explicit sign-out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub subject: SubjectId,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub is_active: bool,
    /// Platform bearer token. Absent on a degraded federated session, in
    /// which case the user cannot call protected platform APIs.
    #[serde(default)]
    pub access_token: Option<AccessToken>,
    #[serde(default)]
    pub refresh_token: Option<RefreshToken>,
    /// Identity-provider access token, present only for OAuth-originated
    /// sessions. Never used for platform API calls.
    #[serde(default)]
    pub federated_access_token: Option<String>,
    pub valid: bool,
    #[serde(with = "time::serde::timestamp")]
    pub expires_at: OffsetDateTime,
}

impl Session {
    /// Fold an exchange result into a session.
    ///
    /// Mapping rules: the subject is the id the exchange produced (platform
    /// id, or the federated `sub` on the degraded path); role and active flag
    /// come from the exchange result, which already applied the degraded
    /// defaults when backend sync failed; tokens stay unset when the backend
    /// never issued a pair.
    #[must_use]
    pub fn mint(result: &ExchangeResult, now: OffsetDateTime, ttl: Duration) -> Self {
        Self {
            subject: result.user.id.clone(),
            email: result.user.email.clone(),
            name: result.user.name.clone(),
            role: result.user.role.clone(),
            is_active: result.user.is_active,
            access_token: result.tokens.as_ref().map(|t| t.access_token.clone()),
            refresh_token: result.tokens.as_ref().map(|t| t.refresh_token.clone()),
            federated_access_token: None,
            valid: true,
            expires_at: now + ttl,
        }
    }

    /// Attach the identity provider's own access token (OAuth sessions only).
    #[must_use]
    pub fn with_federated_access_token(mut self, token: impl Into<String>) -> Self {
        self.federated_access_token = Some(token.into());
        self
    }

    /// The per-request refresh checkpoint.
    ///
    /// Re-derives validity from expiry and the active flag; a still-valid
    /// session gets a rolling expiry extension. An inactive account forces
    /// `valid = false` without deleting the blob.
    #[must_use]
    pub fn refreshed(mut self, now: OffsetDateTime, ttl: Duration) -> Self {
        self.valid = self.valid && self.is_active && now < self.expires_at;
        if self.valid {
            self.expires_at = now + ttl;
        }
        self
    }

    /// Whether the session is still usable at `now`.
    #[must_use]
    pub fn is_valid_at(&self, now: OffsetDateTime) -> bool {
        self.valid && now < self.expires_at
    }

    /// Whether the session is still usable right now.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(OffsetDateTime::now_utc())
    }

    /// `Authorization` header value for platform API calls.
    ///
    /// `None` when the degraded federated path left no access token; callers
    /// must treat that user as unable to reach protected platform endpoints.
    #[must_use]
    pub fn bearer_token(&self) -> Option<String> {
        self.access_token.as_ref().map(|t| format!("Bearer {t}"))
    }

    /// Display subset for page rendering.
    #[must_use]
    pub fn current_user(&self) -> CurrentUser {
        CurrentUser {
            id: self.subject.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
            role: self.role.clone(),
            is_active: self.is_active,
        }
    }
}

/// Read-only subset of the session exposed to rendering code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub id: SubjectId,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub is_active: bool,
}

/// Resolution state of the session for a given request.
///
/// `Unresolved` means no resolution has happened yet (the guard middleware
/// did not run for this request); consumers must treat it distinctly from
/// `Anonymous` and must not redirect on it.
#[derive(Debug, Clone, Default)]
pub enum SessionState {
    #[default]
    Unresolved,
    Anonymous,
    Authenticated(Session),
}

impl SessionState {
    /// The current session, if one was resolved.
    ///
    /// Returns the session as stored, including invalid or inactive ones;
    /// the route guard is responsible for treating those as logged-out.
    #[must_use]
    pub fn current_session(&self) -> Option<&Session> {
        match self {
            Self::Authenticated(session) => Some(session),
            Self::Unresolved | Self::Anonymous => None,
        }
    }

    /// Display subset of the current user, if a session was resolved.
    #[must_use]
    pub fn current_user(&self) -> Option<CurrentUser> {
        self.current_session().map(Session::current_user)
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::Unresolved)
    }
}
