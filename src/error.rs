//! Error types for the packaging pipeline.
//!
//! Each pipeline stage maps its failures into one taxonomy variant; a failing
//! external command keeps its exit code so the process can propagate it.

use std::fmt;

use thiserror::Error;

/// Detail of a failed pipeline stage.
///
/// Carries the exit code of the triggering external command when there was
/// one; native failures leave it unset.
#[derive(Debug, Clone)]
pub struct StageFailure {
    pub detail: String,
    pub exit_code: Option<i32>,
}

impl StageFailure {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
            exit_code: None,
        }
    }
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.exit_code {
            Some(code) => write!(f, "{} (exit code {})", self.detail, code),
            None => f.write_str(&self.detail),
        }
    }
}

/// Errors that can occur while packaging a signed exchange.
#[derive(Debug, Error)]
pub enum PackagerError {
    #[error("invalid input: {0}")]
    InputValidation(String),

    #[error("commands not found in PATH: {0}")]
    ToolAvailability(String),

    #[error("key generation failed: {0}")]
    KeyGeneration(StageFailure),

    #[error("certificate issuance failed: {0}")]
    CertificateIssuance(StageFailure),

    #[error("OCSP generation failed: {0}")]
    OcspGeneration(StageFailure),

    #[error("encoding failed: {0}")]
    Encoding(StageFailure),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PackagerError {
    pub fn key_generation(detail: impl Into<String>) -> Self {
        Self::KeyGeneration(StageFailure::new(detail))
    }

    pub fn certificate_issuance(detail: impl Into<String>) -> Self {
        Self::CertificateIssuance(StageFailure::new(detail))
    }

    pub fn ocsp_generation(detail: impl Into<String>) -> Self {
        Self::OcspGeneration(StageFailure::new(detail))
    }

    pub fn encoding(detail: impl Into<String>) -> Self {
        Self::Encoding(StageFailure::new(detail))
    }

    /// Process exit code for this error.
    ///
    /// A stage that failed because an external command exited nonzero
    /// propagates that command's exit code; everything else exits 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InputValidation(_) | Self::ToolAvailability(_) | Self::Io(_) => 1,
            Self::KeyGeneration(failure)
            | Self::CertificateIssuance(failure)
            | Self::OcspGeneration(failure)
            | Self::Encoding(failure) => failure.exit_code.unwrap_or(1),
        }
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PackagerError>;
