//! Webhook failures and their HTTP status codes.

use crate::delivery::ForwardError;
use crate::security::GateError;
use crate::sms::ParseError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Terminal outcome of a failed webhook. The body is the Display text.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(#[from] GateError),
    #[error("Bad request: {0}")]
    Parse(#[from] ParseError),
    #[error("Server misconfigured: {0}")]
    Configuration(ForwardError),
    #[error("Downstream error: {0}")]
    Downstream(ForwardError),
}

impl From<ForwardError> for WebhookError {
    fn from(e: ForwardError) -> Self {
        if e.is_configuration() {
            WebhookError::Configuration(e)
        } else {
            WebhookError::Downstream(e)
        }
    }
}

impl WebhookError {
    pub fn status(&self) -> StatusCode {
        match self {
            WebhookError::UnknownProvider(_) | WebhookError::Parse(_) => StatusCode::BAD_REQUEST,
            WebhookError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            WebhookError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            WebhookError::Downstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}
