use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum GateError {
    #[error("missing configuration: {0}")]
    MissingConfig(&'static str),

    #[error("service account private key is not a valid RSA PEM: {0}")]
    InvalidPrivateKey(jsonwebtoken::errors::Error),

    #[error("configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("Database error: {0}")]
    DatabaseError(#[from] SqlxError),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reasons an ID token was not accepted.
///
/// None of these reach the user: the gate turns every one of them into the same
/// landing-page redirect. They exist for the operator log.
#[derive(Debug, ThisError)]
pub enum VerifyError {
    #[error("token header could not be decoded: {0}")]
    MalformedHeader(jsonwebtoken::errors::Error),

    #[error("token header has no `kid`")]
    MissingKeyId,

    #[error("no signing key published for kid `{0}`")]
    UnknownKeyId(String),

    #[error("unexpected token algorithm {0:?}")]
    UnexpectedAlgorithm(jsonwebtoken::Algorithm),

    #[error("token rejected: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("`sub` claim must be a non-empty string of at most 128 characters")]
    InvalidSubject,

    #[error("`iat` claim is in the future")]
    IssuedInFuture,

    #[error("`auth_time` claim is in the future")]
    AuthTimeInFuture,

    #[error("fetching signing keys failed: {0}")]
    KeyFetch(#[from] reqwest::Error),
}

impl IntoResponse for GateError {
    fn into_response(self) -> axum::response::Response {
        let (status, code, message) = match self {
            GateError::MissingConfig(_) | GateError::InvalidPrivateKey(_) | GateError::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "MISCONFIGURED",
                "The service is not configured correctly.",
            ),
            GateError::DatabaseError(_) | GateError::Io(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal server error occurred.",
            ),
            GateError::Reqwest(_) => (
                StatusCode::BAD_GATEWAY,
                "BAD_GATEWAY",
                "Upstream service is unavailable.",
            ),
        };
        let body = ApiErrorResponse {
            error: ApiErrorBody {
                code: code.to_string(),
                message: message.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}

/// Standardized API error response body
#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}
