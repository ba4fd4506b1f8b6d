use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

/// Stable user identifier inside a session.
///
/// This is the platform-issued account id whenever the backend exchange
/// succeeded; for a degraded federated session it falls back to the identity
/// provider's own `sub` claim.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into,
)]
#[serde(transparent)]
pub struct SubjectId(pub String);

impl From<&str> for SubjectId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Platform API bearer credential, forwarded on every dashboard data call.
///
/// Owned exclusively by the [`Session`](crate::session::Session); nothing
/// else persists it.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into,
)]
#[serde(transparent)]
pub struct AccessToken(pub String);

/// Platform API refresh credential, paired with [`AccessToken`].
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into,
)]
#[serde(transparent)]
pub struct RefreshToken(pub String);
