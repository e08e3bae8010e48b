use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Chain {chain} unavailable: no endpoint answered ({attempts} tried)")]
    ChainUnavailable { chain: String, attempts: usize },

    #[error("Unknown chain: {0}")]
    UnknownChain(String),

    #[error("Address required")]
    AddressRequired,

    #[error("Malformed {family} address: {address}")]
    MalformedAddress { family: String, address: String },

    #[error("Invalid contract: {0}")]
    InvalidContract(String),

    #[error("Unsupported token standard: {0}")]
    UnsupportedStandard(String),

    #[error("Amount {amount} is below the minimum {minimum}")]
    BelowMinimumAmount { amount: String, minimum: String },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: String, available: String },

    #[error("Distribution failed: {0}")]
    DistributionFailure(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Signing credential error: {0}")]
    CredentialError(String),

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Errors the caller may retry as-is; the core never retries on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::ChainUnavailable { .. } | AppError::NetworkError(_)
        )
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::ChainUnavailable { .. } => "CHAIN_UNAVAILABLE",
            AppError::UnknownChain(_) => "UNKNOWN_CHAIN",
            AppError::AddressRequired => "ADDRESS_REQUIRED",
            AppError::MalformedAddress { .. } => "MALFORMED_ADDRESS",
            AppError::InvalidContract(_) => "INVALID_CONTRACT",
            AppError::UnsupportedStandard(_) => "UNSUPPORTED_STANDARD",
            AppError::BelowMinimumAmount { .. } => "BELOW_MINIMUM_AMOUNT",
            AppError::InvalidAmount(_) => "INVALID_AMOUNT",
            AppError::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            AppError::DistributionFailure(_) => "DISTRIBUTION_FAILURE",
            AppError::NetworkError(_) => "NETWORK_ERROR",
            AppError::CredentialError(_) => "CREDENTIAL_ERROR",
            AppError::AuthError(_) => "AUTH_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::ChainUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::NetworkError(_) => StatusCode::BAD_GATEWAY,
            AppError::AuthError(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) | AppError::UnknownChain(_) => StatusCode::NOT_FOUND,
            AppError::InsufficientBalance { .. } => StatusCode::CONFLICT,
            AppError::AddressRequired
            | AppError::MalformedAddress { .. }
            | AppError::InvalidContract(_)
            | AppError::UnsupportedStandard(_)
            | AppError::BelowMinimumAmount { .. }
            | AppError::InvalidAmount(_)
            | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::DistributionFailure(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::CredentialError(_) | AppError::Database(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    pub retryable: bool,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::ChainUnavailable { .. } => {
                format!("{}. Network unavailable, please retry.", self)
            }
            // Never echo driver internals to clients.
            AppError::Database(e) => {
                tracing::error!("database error: {}", e);
                "Database error".to_string()
            }
            _ => self.to_string(),
        };

        let body = Json(ErrorResponse {
            success: false,
            error: ErrorDetail {
                code: self.code().to_string(),
                message,
                retryable: self.is_retryable(),
            },
        });

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
