//! Binance-specific error types.

use thiserror::Error;

use crate::application::ports::VenueError;

/// Errors from the Binance adapter.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BinanceError {
    /// Request could not be sent or the response could not be read.
    #[error("network error: {0}")]
    Network(String),

    /// Unexpected HTTP status without an exchange error body.
    #[error("HTTP {status}: {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// Exchange error not classified any further.
    #[error("API error {code}: {message}")]
    Api {
        /// Exchange error code.
        code: i64,
        /// Exchange error message.
        message: String,
    },

    /// New order rejected (`-2010`).
    #[error("order rejected ({code}): {message}")]
    OrderRejected {
        /// Exchange error code.
        code: i64,
        /// Exchange error message.
        message: String,
    },

    /// The exchange does not know the order (`-2011` / `-2013`).
    #[error("order not found: {order_id}")]
    OrderNotFound {
        /// Order id that was asked for.
        order_id: String,
    },

    /// Request weight or order rate exceeded (HTTP 429 / 418).
    #[error("rate limited (retry after {retry_after_secs:?}s)")]
    RateLimited {
        /// `Retry-After` header, when present.
        retry_after_secs: Option<u64>,
    },

    /// API key or signature refused.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// API key or secret not configured.
    #[error("missing API credentials")]
    MissingCredentials,

    /// Signature could not be computed.
    #[error("signing error: {0}")]
    Signing(String),

    /// Response body did not match the expected shape.
    #[error("JSON parsing error: {0}")]
    JsonParse(String),
}

impl BinanceError {
    /// Classify an exchange error code.
    #[must_use]
    pub fn from_code(code: i64, message: String, order_id: Option<&str>) -> Self {
        match code {
            -2011 | -2013 => Self::OrderNotFound {
                order_id: order_id.map_or(message, str::to_string),
            },
            -2010 => Self::OrderRejected { code, message },
            -2014 | -2015 | -1022 => Self::AuthenticationFailed(message),
            _ => Self::Api { code, message },
        }
    }
}

impl From<BinanceError> for VenueError {
    fn from(err: BinanceError) -> Self {
        match err {
            BinanceError::Network(message) => Self::Transport { message },
            BinanceError::Http { status, body } => Self::Transport {
                message: format!("HTTP {status}: {body}"),
            },
            BinanceError::Api { code, message } | BinanceError::OrderRejected { code, message } => {
                Self::Rejected {
                    code: Some(code),
                    reason: message,
                }
            }
            BinanceError::OrderNotFound { order_id } => Self::OrderNotFound {
                venue_order_id: order_id,
            },
            BinanceError::RateLimited { .. } => Self::RateLimited,
            BinanceError::AuthenticationFailed(message) => Self::Authentication { message },
            BinanceError::MissingCredentials => Self::Authentication {
                message: "missing API credentials".to_string(),
            },
            BinanceError::Signing(message) | BinanceError::JsonParse(message) => {
                Self::Unknown { message }
            }
        }
    }
}
