//! Error taxonomy shared across the pipeline.
//!
//! Every fallible stage returns a [`PipelineError`]:
//!
//! | Variant | Meaning | HTTP mapping |
//! |---------|---------|--------------|
//! | `Validation` | malformed or missing input, rejected before side effects | 400 |
//! | `Upstream` | storage / index / model failure, surfaced verbatim | 500 |
//! | `Configuration` | integration misuse, always fatal | 500 |
//! | `Cancelled` | cooperative stop signal, not a failure | — |
//!
//! No stage retries internally; callers own retry policy.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Input rejected before any I/O or side effect.
    #[error("validation error: {0}")]
    Validation(String),

    /// An external collaborator (storage, vector index, embedding or
    /// generation model) failed. The message carries the upstream error
    /// verbatim; nothing is retried here.
    #[error("{service} error: {message}")]
    Upstream {
        service: &'static str,
        message: String,
    },

    /// The integration is wired up wrong (e.g. a generation model that
    /// returns more than one output field). Not recoverable per-request.
    #[error("configuration fault: {0}")]
    Configuration(String),

    /// Cooperative cancellation. Carries no payload; the partial state is
    /// persisted by whoever observed the signal.
    #[error("cancelled")]
    Cancelled,
}

impl PipelineError {
    pub fn validation(message: impl Into<String>) -> Self {
        PipelineError::Validation(message.into())
    }

    pub fn upstream(service: &'static str, err: impl std::fmt::Display) -> Self {
        PipelineError::Upstream {
            service,
            message: err.to_string(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        PipelineError::Configuration(message.into())
    }

    /// Machine-readable code used in serialized error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::Validation(_) => "validation_error",
            PipelineError::Upstream { .. } => "upstream_error",
            PipelineError::Configuration(_) => "configuration_fault",
            PipelineError::Cancelled => "cancelled",
        }
    }

    /// Serialize to the JSON error body written on failure frames and
    /// non-2xx responses: `{"error":{"code":...,"message":...}}`.
    pub fn serialized(&self) -> String {
        serde_json::json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        })
        .to_string()
    }
}
