use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum LedgerError {
    #[error("Missing environment variables for {engine}/{db_name}: {missing:?}")]
    MissingCredentials {
        engine: String,
        db_name: String,
        missing: Vec<String>,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Configuration error: {0}")]
    Config(#[from] figment::Error),

    #[error("Unsupported db engine: {0}")]
    UnsupportedEngine(String),

    #[error("Invalid expense: {0}")]
    InvalidExpense(String),

    #[error("Invalid statement: {0}")]
    InvalidStatement(String),

    #[error("Unexpected row shape: {0}")]
    RowShape(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] SqlxError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("API responded with {status}: {message}")]
    ApiStatus { status: StatusCode, message: String },
}

impl IntoResponse for LedgerError {
    fn into_response(self) -> axum::response::Response {
        let detail = ErrorDetail(self.to_string());
        let (status, error_body) = match self {
            LedgerError::InvalidExpense(message) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ApiErrorBody {
                    code: "INVALID_EXPENSE".to_string(),
                    message,
                },
            ),
            LedgerError::MissingCredentials { .. }
            | LedgerError::InvalidConfig(_)
            | LedgerError::Config(_)
            | LedgerError::UnsupportedEngine(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiErrorBody {
                    code: "MISCONFIGURED".to_string(),
                    message: "The server is not configured correctly.".to_string(),
                },
            ),
            LedgerError::InvalidStatement(_)
            | LedgerError::RowShape(_)
            | LedgerError::DatabaseError(_)
            | LedgerError::UrlParse(_)
            | LedgerError::Reqwest(_)
            | LedgerError::ApiStatus { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiErrorBody {
                    code: "INTERNAL_ERROR".to_string(),
                    message: "An internal server error occurred.".to_string(),
                },
            ),
        };
        let mut resp = (status, Json(ApiErrorResponse { error: error_body })).into_response();
        resp.extensions_mut().insert(detail);
        resp
    }
}

/// The full error text, attached to error responses so the request layer
/// can log it next to the request id. Never serialized.
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub String);

/// Standardized API error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}
