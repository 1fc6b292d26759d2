//! # Crate Error Types
//!
//! Top-level error enum aggregating the module-local error types. Each
//! subsystem (cache, downstream, pipeline, transport) defines its own
//! `thiserror` enum and converts into [`AegisError`] at the crate boundary.

use thiserror::Error;

/// Crate-wide error type
#[derive(Debug, Error)]
pub enum AegisError {
    #[error("Downstream error: {0}")]
    Downstream(#[from] crate::downstream::DownstreamError),

    #[error("Cache error: {0}")]
    Cache(#[from] crate::cache::CacheError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] crate::pipeline::PipelineError),

    #[error("Transport error: {0}")]
    Transport(#[from] crate::transport::TransportError),

    #[error("Dead letter write failure: {0}")]
    DeadLetter(#[from] crate::pipeline::DeadLetterWriteFailure),

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl AegisError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

/// Result type alias for crate operations
pub type Result<T> = std::result::Result<T, AegisError>;
