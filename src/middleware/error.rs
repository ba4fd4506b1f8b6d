use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::api::{ExchangeError, FieldError};

/// Authentication errors for the middleware layer.
///
/// OAuth flow failures never appear here: the callback turns them into
/// redirects toward the configured error destination, so only exchange
/// failures and internal errors reach this response mapping.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Credential exchange failure, forwarded with its structured payload.
    #[error(transparent)]
    Exchange(#[from] ExchangeError),

    /// Session cookie could not be encoded.
    #[error("Session encoding error: {0}")]
    Session(String),

    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Wire shape for exchange failures: mirrors the platform envelope so forms
/// can map `errors[].field` to inputs without caring where the failure arose.
#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<FieldError>,
}

fn exchange_response(err: ExchangeError) -> Response {
    let code = err.code().to_owned();
    let (status, body) = match err {
        ExchangeError::Validation { message } => (
            StatusCode::BAD_REQUEST,
            ErrorBody {
                success: false,
                message,
                code: Some(code),
                errors: Vec::new(),
            },
        ),
        ExchangeError::BackendRejected {
            message,
            code,
            field_errors,
        } => {
            let status = if code.as_deref() == Some("VALIDATION_ERROR") {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::UNAUTHORIZED
            };
            (
                status,
                ErrorBody {
                    success: false,
                    message,
                    code,
                    errors: field_errors,
                },
            )
        }
        ExchangeError::Network(e) => {
            tracing::error!(error = %e, "exchange request could not complete");
            (
                StatusCode::BAD_GATEWAY,
                ErrorBody {
                    success: false,
                    message: "The service is temporarily unreachable. Please try again.".into(),
                    code: Some(code),
                    errors: Vec::new(),
                },
            )
        }
    };
    (status, Json(body)).into_response()
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            Self::Exchange(err) => exchange_response(err),
            Self::Session(_) | Self::Config(_) => {
                tracing::error!(error = %self, "Auth internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn backend_rejection_round_trips_field_errors() {
        let err = AuthError::Exchange(ExchangeError::BackendRejected {
            message: "Validation failed".into(),
            code: Some("VALIDATION_ERROR".into()),
            field_errors: vec![FieldError {
                field: "email".into(),
                message: "Invalid email format".into(),
            }],
        });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Validation failed");
        assert_eq!(json["code"], "VALIDATION_ERROR");
        assert_eq!(json["errors"][0]["field"], "email");
        assert_eq!(json["errors"][0]["message"], "Invalid email format");
    }

    #[tokio::test]
    async fn auth_rejection_is_unauthorized() {
        let err = AuthError::Exchange(ExchangeError::BackendRejected {
            message: "Invalid credentials".into(),
            code: Some("AUTH_ERROR".into()),
            field_errors: Vec::new(),
        });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let json = body_json(response).await;
        assert_eq!(json["message"], "Invalid credentials");
        assert!(json.get("errors").is_none(), "empty error list is omitted");
    }

    #[tokio::test]
    async fn client_validation_is_bad_request() {
        let err = AuthError::Exchange(ExchangeError::Validation {
            message: "Email and password are required".into(),
        });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = body_json(response).await;
        assert_eq!(json["message"], "Email and password are required");
        assert_eq!(json["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn internal_errors_stay_opaque() {
        for err in [
            AuthError::Session("cookie too large".into()),
            AuthError::Config("missing key".into()),
        ] {
            let response = err.into_response();
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            assert_eq!(&bytes[..], b"Internal error", "details never leak");
        }
    }
}
