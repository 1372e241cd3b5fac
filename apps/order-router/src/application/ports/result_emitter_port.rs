//! Result Emitter Port (Driven Port)
//!
//! Publishes the final state of every resolved command.

use async_trait::async_trait;

use crate::application::dto::OrderResult;

/// Result publishing error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EmitError {
    /// Write failed.
    #[error("result publish failed: {message}")]
    PublishFailed {
        /// Error details.
        message: String,
    },

    /// Serialization error.
    #[error("result serialization error: {message}")]
    SerializationError {
        /// Error details.
        message: String,
    },

    /// Downstream channel closed.
    #[error("result channel closed")]
    Closed,
}

/// Port for publishing order results.
#[async_trait]
pub trait ResultEmitterPort: Send + Sync {
    /// Publish one result.
    async fn emit(&self, result: &OrderResult) -> Result<(), EmitError>;
}

/// Emitter that drops every result.
#[derive(Debug, Clone, Default)]
pub struct NoOpResultEmitter;

#[async_trait]
impl ResultEmitterPort for NoOpResultEmitter {
    async fn emit(&self, _result: &OrderResult) -> Result<(), EmitError> {
        Ok(())
    }
}
