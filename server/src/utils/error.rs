use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::gateway::GatewayError;
use crate::store::StoreError;
use crate::utils::response::error as error_response;

const GENERIC_FAILURE: &str = "An error occurred. Please try again.";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Insufficient inventory: requested {requested}, remaining {remaining}")]
    InsufficientInventory { requested: i32, remaining: i32 },

    #[error("Ticket is not free")]
    NotFree,

    #[error("Payment not verified: {0}")]
    PaymentNotVerified(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Payment gateway error")]
    Gateway(#[from] GatewayError),

    #[error("Storage error")]
    Store(#[source] StoreError),

    #[error("Internal server error")]
    Internal(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateReference(reference) => {
                AppError::Conflict(format!("Payment reference '{}' already exists", reference))
            }
            other => AppError::Store(other),
        }
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InsufficientInventory { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFree => StatusCode::BAD_REQUEST,
            AppError::PaymentNotVerified(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Gateway(e) if e.is_rejection() => StatusCode::BAD_REQUEST,
            AppError::Gateway(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidInput(_) => "INVALID_INPUT",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::InsufficientInventory { .. } => "INSUFFICIENT_INVENTORY",
            AppError::NotFree => "NOT_FREE",
            AppError::PaymentNotVerified(_) => "PAYMENT_NOT_VERIFIED",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Gateway(_) => "GATEWAY_ERROR",
            AppError::Store(_) => "INTERNAL_SERVER_ERROR",
            AppError::Internal(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    fn log(&self) {
        match self {
            AppError::Gateway(e) => error!(error = %e, "Payment gateway error"),
            AppError::Store(e) => error!(error = ?e, "Storage error"),
            AppError::Internal(msg) => error!(message = %msg, "Internal error"),
            other => warn!(code = other.code(), error = %other, "Request rejected"),
        }
    }

    /// Message safe to hand back to the client.
    fn public_message(&self) -> String {
        match self {
            AppError::InvalidInput(msg)
            | AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg) => msg.clone(),
            AppError::InsufficientInventory { .. } => {
                "Insufficient tickets available for purchase".to_string()
            }
            AppError::NotFree => {
                "This is a paid ticket. You need to make the payment.".to_string()
            }
            AppError::PaymentNotVerified(_) => "Payment verification failed".to_string(),
            AppError::Gateway(e) => match e.provider_message() {
                Some(msg) => msg.to_string(),
                None => GENERIC_FAILURE.to_string(),
            },
            AppError::Store(_) | AppError::Internal(_) => GENERIC_FAILURE.to_string(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            AppError::InsufficientInventory {
                requested,
                remaining,
            } => Some(json!({ "requested": requested, "remaining": remaining })),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        self.log();

        error_response(code, self.public_message(), self.details(), status)
    }
}
