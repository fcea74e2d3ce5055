use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Generic localized message for failures the shopper cannot act on.
pub const GENERIC_ORDER_ERROR: &str = "Došlo je do greške prilikom procesiranja narudžbe.";
/// Localized message for failures raised by the payment processor.
pub const GENERIC_PAYMENT_ERROR: &str = "Došlo je do greške prilikom procesiranja plaćanja.";
/// Localized message for a confirmed payment whose emails could not be sent.
pub const NOTIFICATION_ERROR: &str =
    "Narudžba je plaćena, ali potvrda e-poštom nije poslana. Kontaktirajte podršku.";

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    #[serde(rename = "type")]
    pub error_type: String,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Missing configuration: {0}")]
    Configuration(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Payment processor unavailable: {0}")]
    ProcessorUnavailable(String),

    #[error("Payment processor rejected request: {0}")]
    ProcessorRejected(String),

    #[error("Notification delivery failed: {0}")]
    NotificationFailed(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ServiceError {
    /// Single source of truth for the error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ProcessorRejected(_) => StatusCode::PAYMENT_REQUIRED,
            Self::ProcessorUnavailable(_) | Self::NotificationFailed(_) => StatusCode::BAD_GATEWAY,
            Self::Configuration(_) | Self::ParseError(_) | Self::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration_error",
            Self::InvalidInput(_) => "invalid",
            Self::NotFound(_) => "not_found",
            Self::ProcessorUnavailable(_) => "processor_unavailable",
            Self::ProcessorRejected(_) => "payment_failed",
            Self::NotificationFailed(_) => "notification_failed",
            Self::ParseError(_) => "parse_error",
            Self::InternalError(_) => "internal_error",
        }
    }

    /// Shopper-facing message. Validation messages are already localized;
    /// everything internal collapses to a generic localized message so
    /// processor/transport details never leak.
    pub fn response_message(&self) -> String {
        match self {
            Self::InvalidInput(msg) | Self::NotFound(msg) => msg.clone(),
            Self::ProcessorUnavailable(_) | Self::ProcessorRejected(_) => {
                GENERIC_PAYMENT_ERROR.to_string()
            }
            Self::NotificationFailed(_) => NOTIFICATION_ERROR.to_string(),
            Self::Configuration(_) | Self::ParseError(_) | Self::InternalError(_) => {
                GENERIC_ORDER_ERROR.to_string()
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Service error: {0}")]
    ServiceError(#[from] ServiceError),

    #[error("Bad request: {message}")]
    BadRequest {
        message: String,
        error_code: Option<String>,
    },

    #[error("Internal server error: {message}")]
    InternalServerError { message: String },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::ServiceError(service_error) => (
                service_error.status_code(),
                service_error.code().to_string(),
                service_error.response_message(),
            ),
            ApiError::BadRequest {
                message,
                error_code,
            } => (
                StatusCode::BAD_REQUEST,
                error_code.clone().unwrap_or_else(|| "invalid".to_string()),
                message.clone(),
            ),
            ApiError::InternalServerError { message } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error".to_string(),
                message.clone(),
            ),
        };

        let error_type = if status.is_client_error() {
            "invalid_request".to_string()
        } else {
            "processing_error".to_string()
        };

        let error_response = ErrorResponse {
            error_type,
            code,
            message,
            param: None,
        };

        (status, Json(error_response)).into_response()
    }
}
