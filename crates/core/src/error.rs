use serde::Serialize;
use thiserror::Error;

use crate::types::JobPhase;

/// Message shown to users for any conversion failure. Engine diagnostics
/// are logged, never surfaced.
pub const USER_FAILURE_MESSAGE: &str =
    "Something went wrong during the conversion process. Try again.";

/// Conversion error taxonomy.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("engine not ready")]
    EngineNotReady,

    #[error("no input selected")]
    NoInputSelected,

    #[error("conversion failed while {stage}: {detail}")]
    ConversionFailure { stage: JobPhase, detail: String },

    #[error("output size unavailable: {0}")]
    StatUnavailable(String),
}

impl ConvertError {
    pub fn failure(stage: JobPhase, detail: impl std::fmt::Display) -> Self {
        Self::ConversionFailure {
            stage,
            detail: detail.to_string(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::EngineNotReady => "engine_not_ready",
            Self::NoInputSelected => "no_input_selected",
            Self::ConversionFailure { .. } => "conversion_failure",
            Self::StatUnavailable(_) => "stat_unavailable",
        }
    }

    /// User-safe message; never includes engine output.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::EngineNotReady => "The converter is still loading.",
            Self::NoInputSelected => "Choose a file first.",
            Self::ConversionFailure { .. } | Self::StatUnavailable(_) => USER_FAILURE_MESSAGE,
        }
    }
}

/// Serializable error summary for presentation layers.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorSummary {
    pub code: String,
    pub message: String,
}

impl From<&ConvertError> for ErrorSummary {
    fn from(e: &ConvertError) -> Self {
        Self {
            code: e.code().to_string(),
            message: e.user_message().to_string(),
        }
    }
}
