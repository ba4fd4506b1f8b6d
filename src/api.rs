//! Credential exchange against the MinisPod platform API.
//!
//! Every response is decoded once at this boundary into typed results.
//! Backend rejections keep the structured payload (message, code, field
//! errors) verbatim so forms can render field-specific messages.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::session::Role;
use crate::types::{AccessToken, RefreshToken, SubjectId};

/// Platform API endpoint configuration.
///
/// Required field is a constructor parameter; endpoint paths have defaults
/// matching the platform API and can be overridden with `with_*` methods.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct BackendConfig {
    pub(crate) base_url: Url,
    pub(crate) login_path: String,
    pub(crate) register_path: String,
    pub(crate) google_path: String,
}

impl BackendConfig {
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            login_path: "/auth/login".into(),
            register_path: "/auth/register".into(),
            google_path: "/auth/google".into(),
        }
    }

    #[must_use]
    pub fn with_login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = path.into();
        self
    }

    #[must_use]
    pub fn with_register_path(mut self, path: impl Into<String>) -> Self {
        self.register_path = path.into();
        self
    }

    #[must_use]
    pub fn with_google_path(mut self, path: impl Into<String>) -> Self {
        self.google_path = path.into();
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path)
    }
}

/// One `{field, message}` entry from a backend validation rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// The platform API response envelope, decoded once per call.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    data: Option<T>,
    message: Option<String>,
    code: Option<String>,
    #[serde(default)]
    errors: Vec<FieldError>,
}

/// User record as returned by the platform on a successful exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRecord {
    pub id: SubjectId,
    pub email: String,
    #[serde(default)]
    pub name: String,
    pub role: Role,
    pub is_active: bool,
}

/// Bearer token pair issued by the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
}

#[derive(Debug, Deserialize)]
struct ExchangePayload {
    user: AccountRecord,
    tokens: Option<TokenPair>,
}

/// Normalized outcome of a successful credential exchange.
///
/// `degraded` marks a federated login that proceeded despite a failed backend
/// sync: role and active flag hold defaults and `tokens` is `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeResult {
    pub user: AccountRecord,
    pub tokens: Option<TokenPair>,
    pub degraded: bool,
}

#[cfg(feature = "google")]
impl ExchangeResult {
    /// Degraded result built from identity-provider claims alone.
    ///
    /// Availability-over-strictness: a federated identity proceeds with
    /// default USER/active privileges when backend sync fails. Deliberate,
    /// preserved behavior; see DESIGN.md before changing it.
    #[must_use]
    pub(crate) fn degraded(identity: &crate::google::IdClaims) -> Self {
        Self {
            user: AccountRecord {
                id: identity.sub.as_str().into(),
                email: identity.email.clone().unwrap_or_default(),
                name: identity.display_name(),
                role: Role::default(),
                is_active: true,
            },
            tokens: None,
            degraded: true,
        }
    }
}

/// Failure taxonomy surfaced by the exchange client.
#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    /// Client-detected missing/mismatched input; the backend is never called.
    #[error("{message}")]
    Validation { message: String },

    /// The backend answered with `success: false`. Carries the backend's
    /// message, code and field errors unchanged.
    #[error("backend rejected request: {message}")]
    BackendRejected {
        message: String,
        code: Option<String>,
        field_errors: Vec<FieldError>,
    },

    /// The request could not complete (transport or undecodable body).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl ExchangeError {
    /// Stable machine-readable code; backend-provided when available.
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::BackendRejected { code, .. } => code.as_deref().unwrap_or("AUTH_ERROR"),
            Self::Network(_) => "NETWORK_ERROR",
        }
    }
}

/// Registration input, pre-validated before any backend call.
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl Registration {
    pub(crate) fn validate(&self) -> Result<(), ExchangeError> {
        if self.name.trim().is_empty()
            || self.email.trim().is_empty()
            || self.password.is_empty()
            || self.confirm_password.is_empty()
        {
            return Err(ExchangeError::Validation {
                message: "All fields are required".into(),
            });
        }
        if self.password != self.confirm_password {
            return Err(ExchangeError::Validation {
                message: "Passwords do not match".into(),
            });
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterBody<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
    confirm_password: &'a str,
}

#[cfg(feature = "google")]
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FederatedBody<'a> {
    id_token: &'a str,
}

/// The Credential Exchange Client.
pub struct BackendClient {
    config: BackendConfig,
    http: reqwest::Client,
}

impl BackendClient {
    #[must_use]
    pub fn new(config: BackendConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    /// Exchange an email/password pair for tokens.
    ///
    /// # Errors
    ///
    /// [`ExchangeError::Validation`] for empty input (no network call is
    /// made), [`ExchangeError::BackendRejected`] for a structured backend
    /// refusal, [`ExchangeError::Network`] for transport failures.
    pub async fn exchange_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<ExchangeResult, ExchangeError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(ExchangeError::Validation {
                message: "Email and password are required".into(),
            });
        }

        let response = self
            .http
            .post(self.config.endpoint(&self.config.login_path))
            .json(&LoginBody { email, password })
            .send()
            .await?;

        let payload: ExchangePayload = decode_envelope(response).await?;
        Ok(ExchangeResult {
            user: payload.user,
            tokens: payload.tokens,
            degraded: false,
        })
    }

    /// Register a new account. Returns the backend's success message.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`exchange_password`](Self::exchange_password);
    /// required-field and password-confirmation checks run before the call.
    pub async fn register(&self, registration: &Registration) -> Result<Option<String>, ExchangeError> {
        registration.validate()?;

        let response = self
            .http
            .post(self.config.endpoint(&self.config.register_path))
            .json(&RegisterBody {
                name: &registration.name,
                email: &registration.email,
                password: &registration.password,
                confirm_password: &registration.confirm_password,
            })
            .send()
            .await?;

        let (status, envelope) = split_envelope::<serde_json::Value>(response).await?;
        if status.is_success() && envelope.success {
            Ok(envelope.message)
        } else {
            Err(reject(status, envelope))
        }
    }

    /// Exchange a Google ID token with the platform's federated endpoint.
    ///
    /// Infallible: when the backend sync fails (transport or rejection) the
    /// login still proceeds with a degraded result built from the identity
    /// claims. The degradation is recorded, not surfaced to the user.
    #[cfg(feature = "google")]
    pub async fn exchange_federated_token(
        &self,
        id_token: &str,
        identity: &crate::google::IdClaims,
    ) -> ExchangeResult {
        match self.try_federated(id_token).await {
            Ok(result) => result,
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    subject = %identity.sub,
                    "federated backend sync failed, proceeding with degraded session"
                );
                ExchangeResult::degraded(identity)
            }
        }
    }

    #[cfg(feature = "google")]
    async fn try_federated(&self, id_token: &str) -> Result<ExchangeResult, ExchangeError> {
        let response = self
            .http
            .post(self.config.endpoint(&self.config.google_path))
            .json(&FederatedBody { id_token })
            .send()
            .await?;

        let payload: ExchangePayload = decode_envelope(response).await?;
        Ok(ExchangeResult {
            user: payload.user,
            tokens: payload.tokens,
            degraded: false,
        })
    }
}

async fn split_envelope<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<(reqwest::StatusCode, Envelope<T>), ExchangeError> {
    let status = response.status();
    // An undecodable body is a transport-level failure, not a rejection.
    let envelope = response.json::<Envelope<T>>().await?;
    Ok((status, envelope))
}

async fn decode_envelope<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ExchangeError> {
    let (status, envelope) = split_envelope::<T>(response).await?;
    if status.is_success() && envelope.success {
        envelope.data.ok_or_else(|| ExchangeError::BackendRejected {
            message: "backend reported success without a payload".into(),
            code: None,
            field_errors: Vec::new(),
        })
    } else {
        Err(reject(status, envelope))
    }
}

fn reject<T>(status: reqwest::StatusCode, envelope: Envelope<T>) -> ExchangeError {
    ExchangeError::BackendRejected {
        message: envelope
            .message
            .unwrap_or_else(|| format!("backend returned status {status}")),
        code: envelope.code,
        field_errors: envelope.errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Role;

    fn client() -> BackendClient {
        // Unroutable base URL: tests must never reach the network.
        BackendClient::new(BackendConfig::new("http://127.0.0.1:9".parse().unwrap()))
    }

    fn response(status: u16, body: &str) -> reqwest::Response {
        axum::http::Response::builder()
            .status(status)
            .header("content-type", "application/json")
            .body(body.to_string())
            .unwrap()
            .into()
    }

    #[tokio::test]
    async fn empty_email_short_circuits_without_network() {
        let err = client().exchange_password("", "secret").await.unwrap_err();
        match err {
            ExchangeError::Validation { message } => {
                assert_eq!(message, "Email and password are required");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_password_short_circuits_without_network() {
        let err = client().exchange_password("a@b.com", "").await.unwrap_err();
        assert!(matches!(err, ExchangeError::Validation { .. }));
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn success_envelope_maps_user_and_tokens() {
        let body = r#"{
            "success": true,
            "data": {
                "user": {"id":"u1","email":"a@b.com","name":"A","role":"USER","isActive":true},
                "tokens": {"accessToken":"t1","refreshToken":"r1"}
            }
        }"#;
        let payload: ExchangePayload = decode_envelope(response(200, body)).await.unwrap();

        assert_eq!(payload.user.id, "u1".into());
        assert_eq!(payload.user.role, Role::User);
        assert!(payload.user.is_active);
        let tokens = payload.tokens.unwrap();
        assert_eq!(tokens.access_token, "t1".to_string().into());
        assert_eq!(tokens.refresh_token, "r1".to_string().into());
    }

    #[tokio::test]
    async fn rejection_preserves_field_errors_verbatim() {
        let body = r#"{
            "success": false,
            "message": "Validation failed",
            "code": "VALIDATION_ERROR",
            "errors": [
                {"field":"email","message":"Invalid email format"},
                {"field":"password","message":"Too short"}
            ]
        }"#;
        let err = decode_envelope::<ExchangePayload>(response(400, body))
            .await
            .unwrap_err();

        match err {
            ExchangeError::BackendRejected {
                message,
                code,
                field_errors,
            } => {
                assert_eq!(message, "Validation failed");
                assert_eq!(code.as_deref(), Some("VALIDATION_ERROR"));
                assert_eq!(
                    field_errors,
                    vec![
                        FieldError {
                            field: "email".into(),
                            message: "Invalid email format".into()
                        },
                        FieldError {
                            field: "password".into(),
                            message: "Too short".into()
                        },
                    ]
                );
            }
            other => panic!("expected backend rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn http_error_without_success_flag_is_rejected() {
        let err = decode_envelope::<ExchangePayload>(response(401, r#"{"success":false,"message":"Invalid credentials","code":"AUTH_ERROR"}"#))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "AUTH_ERROR");
    }

    #[tokio::test]
    async fn success_body_on_error_status_is_rejected() {
        // status wins: a 500 with success:true is not a success
        let body = r#"{"success":true,"data":{"user":{"id":"u1","email":"a@b.com","role":"USER","isActive":true}}}"#;
        let err = decode_envelope::<ExchangePayload>(response(500, body))
            .await
            .unwrap_err();
        assert!(matches!(err, ExchangeError::BackendRejected { .. }));
    }

    #[test]
    fn registration_requires_all_fields() {
        let reg = Registration {
            name: "A".into(),
            email: "a@b.com".into(),
            password: "x".into(),
            confirm_password: String::new(),
        };
        let err = reg.validate().unwrap_err();
        assert!(matches!(err, ExchangeError::Validation { .. }));
    }

    #[test]
    fn registration_requires_matching_passwords() {
        let reg = Registration {
            name: "A".into(),
            email: "a@b.com".into(),
            password: "x".into(),
            confirm_password: "y".into(),
        };
        match reg.validate().unwrap_err() {
            ExchangeError::Validation { message } => {
                assert_eq!(message, "Passwords do not match");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn register_prevalidates_before_any_network_call() {
        let reg = Registration {
            name: String::new(),
            email: "a@b.com".into(),
            password: "x".into(),
            confirm_password: "x".into(),
        };
        // Unroutable client: an attempted call would fail differently.
        let err = client().register(&reg).await.unwrap_err();
        assert!(matches!(err, ExchangeError::Validation { .. }));
    }

    #[cfg(feature = "google")]
    #[tokio::test]
    async fn federated_exchange_degrades_when_backend_is_unreachable() {
        use time::{Duration, OffsetDateTime};

        use crate::google::IdClaims;
        use crate::session::Session;

        let claims: IdClaims =
            serde_json::from_str(r#"{"sub":"g-77","email":"dana@example.com","name":"Dana"}"#)
                .unwrap();

        // Unroutable backend: the sync fails, the login still proceeds.
        let result = client()
            .exchange_federated_token("header.payload.sig", &claims)
            .await;

        assert!(result.degraded);
        assert_eq!(result.user.id, "g-77".into());
        assert_eq!(result.user.role, Role::User);
        assert!(result.user.is_active);
        assert!(result.tokens.is_none());

        // Minting from the degraded result yields a usable, token-less session.
        let session = Session::mint(&result, OffsetDateTime::now_utc(), Duration::days(30));
        assert!(session.valid);
        assert_eq!(session.bearer_token(), None);
    }

    #[test]
    fn endpoint_joins_without_double_slash() {
        let config = BackendConfig::new("http://api.example.com/v1/".parse().unwrap());
        assert_eq!(
            config.endpoint(&config.login_path),
            "http://api.example.com/v1/auth/login"
        );
    }
}
