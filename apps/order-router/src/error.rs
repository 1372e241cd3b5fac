//! Rich error handling for the order router.
//!
//! Errors surfaced at the operator HTTP boundary carry a stable code, a
//! message and key/value context, and map onto an HTTP status.
//!
//! | Code | HTTP | Usage |
//! |------|------|-------|
//! | `INVALID_REQUEST` | 400 | Body is not an order record |
//! | `INVALID_ORDER` | 422 | Record fails validation |
//! | `ORDER_REJECTED` | 409 | Venue refused the order |
//! | `ORDER_NOT_FOUND` | 404 | Venue does not know the order |
//! | `RATE_LIMITED` | 429 | Venue rate limit hit |
//! | `DISPATCHER_CLOSED` | 503 | Router is shutting down |
//! | `VENUE_UNAVAILABLE` | 502 | Venue unreachable or timed out |
//! | `INTERNAL_ERROR` | 500 | Unexpected failure |

use std::collections::HashMap;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::ports::VenueError;
use crate::application::services::DispatchError;
use crate::domain::order::OrderValidationError;

/// Error codes for the order router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Request body could not be decoded.
    InvalidRequest,
    /// Order record failed validation.
    InvalidOrder,
    /// Order refused by the venue.
    OrderRejected,
    /// Order unknown to the venue.
    OrderNotFound,
    /// Venue rate limit hit.
    RateLimited,
    /// Dispatcher no longer accepts work.
    DispatcherClosed,
    /// Venue unreachable, timed out or refusing credentials.
    VenueUnavailable,
    /// Internal server error.
    InternalError,
}

impl ErrorCode {
    /// HTTP status for this error.
    #[must_use]
    pub const fn http_status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest => StatusCode::BAD_REQUEST,
            Self::InvalidOrder => StatusCode::UNPROCESSABLE_ENTITY,
            Self::OrderRejected => StatusCode::CONFLICT,
            Self::OrderNotFound => StatusCode::NOT_FOUND,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::DispatcherClosed => StatusCode::SERVICE_UNAVAILABLE,
            Self::VenueUnavailable => StatusCode::BAD_GATEWAY,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable reason string.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "INVALID_REQUEST",
            Self::InvalidOrder => "INVALID_ORDER",
            Self::OrderRejected => "ORDER_REJECTED",
            Self::OrderNotFound => "ORDER_NOT_FOUND",
            Self::RateLimited => "RATE_LIMITED",
            Self::DispatcherClosed => "DISPATCHER_CLOSED",
            Self::VenueUnavailable => "VENUE_UNAVAILABLE",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reason())
    }
}

/// A rich error with context.
#[derive(Debug, Error)]
pub struct RouterError {
    code: ErrorCode,
    message: String,
    context: Vec<(String, String)>,
}

impl RouterError {
    /// Create a new router error.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: Vec::new(),
        }
    }

    /// Add context to the error.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.push((key.into(), value.into()));
        self
    }

    /// Error code.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        self.code
    }

    /// Message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Context pairs.
    #[must_use]
    pub fn context(&self) -> &[(String, String)] {
        &self.context
    }

    /// Convert to an HTTP error body.
    #[must_use]
    pub fn to_http_response(&self) -> HttpErrorResponse {
        HttpErrorResponse {
            code: self.code.reason().to_string(),
            message: self.message.clone(),
            status: self.code.http_status().as_u16(),
            details: self.context.iter().cloned().collect(),
        }
    }

    /// Malformed request body.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    /// Internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl std::fmt::Display for RouterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code.reason(), self.message)
    }
}

impl From<OrderValidationError> for RouterError {
    fn from(err: OrderValidationError) -> Self {
        let code = match err {
            OrderValidationError::Malformed(_) => ErrorCode::InvalidRequest,
            _ => ErrorCode::InvalidOrder,
        };
        Self::new(code, err.to_string())
    }
}

impl From<VenueError> for RouterError {
    fn from(err: VenueError) -> Self {
        let code = match &err {
            VenueError::Rejected { .. } => ErrorCode::OrderRejected,
            VenueError::OrderNotFound { .. } => ErrorCode::OrderNotFound,
            VenueError::RateLimited => ErrorCode::RateLimited,
            VenueError::Transport { .. }
            | VenueError::Authentication { .. }
            | VenueError::Unknown { .. } => ErrorCode::VenueUnavailable,
        };
        let mut error = Self::new(code, err.to_string());
        if let VenueError::Rejected {
            code: Some(venue_code),
            ..
        } = err
        {
            error = error.with_context("venue_code", venue_code.to_string());
        }
        error
    }
}

impl From<DispatchError> for RouterError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::Venue(e) => e.into(),
            DispatchError::TimedOut { .. } => {
                Self::new(ErrorCode::VenueUnavailable, err.to_string())
            }
            DispatchError::Closed => Self::new(ErrorCode::DispatcherClosed, err.to_string()),
            DispatchError::InvalidSettings { .. } => Self::internal(err.to_string()),
        }
    }
}

impl IntoResponse for RouterError {
    fn into_response(self) -> Response {
        (self.code.http_status(), Json(self.to_http_response())).into_response()
    }
}

/// HTTP error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpErrorResponse {
    /// Error code string.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// HTTP status code.
    pub status: u16,
    /// Additional details.
    pub details: HashMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn error_code_http_mapping() {
        assert_eq!(ErrorCode::InvalidRequest.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ErrorCode::DispatcherClosed.http_status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(ErrorCode::RateLimited.http_status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn router_error_creation() {
        let error = RouterError::new(ErrorCode::InvalidOrder, "quantity must be positive")
            .with_context("order_id", "42");

        assert_eq!(error.code(), ErrorCode::InvalidOrder);
        assert_eq!(error.message(), "quantity must be positive");
        assert_eq!(error.context().len(), 1);
        assert_eq!(error.to_string(), "[INVALID_ORDER] quantity must be positive");
    }

    #[test]
    fn venue_rejection_keeps_code() {
        let error: RouterError = VenueError::Rejected {
            code: Some(-2010),
            reason: "insufficient balance".to_string(),
        }
        .into();
        let response = error.to_http_response();

        assert_eq!(response.code, "ORDER_REJECTED");
        assert_eq!(response.status, 409);
        assert_eq!(response.details.get("venue_code").map(String::as_str), Some("-2010"));
    }

    #[test]
    fn dispatch_errors_map() {
        let closed: RouterError = DispatchError::Closed.into();
        assert_eq!(closed.code(), ErrorCode::DispatcherClosed);

        let timed_out: RouterError = DispatchError::TimedOut {
            after: Duration::from_secs(1),
        }
        .into();
        assert_eq!(timed_out.code(), ErrorCode::VenueUnavailable);

        let venue: RouterError = DispatchError::Venue(VenueError::RateLimited).into();
        assert_eq!(venue.code(), ErrorCode::RateLimited);
    }

    #[test]
    fn validation_errors_map() {
        let malformed: RouterError = OrderValidationError::Malformed("eof".to_string()).into();
        assert_eq!(malformed.code(), ErrorCode::InvalidRequest);

        let missing: RouterError = OrderValidationError::MissingSymbol.into();
        assert_eq!(missing.code(), ErrorCode::InvalidOrder);
    }
}
