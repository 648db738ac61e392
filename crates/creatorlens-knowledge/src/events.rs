use serde::Serialize;

/// Pipeline stage identifier, serialized lowercase for the SSE payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Summaries,
    Topics,
    Profile,
    Style,
    Platform,
    Processing,
    Done,
    Error,
}

/// One progress event. `progress` runs 0.0 to 1.0 across the whole
/// pipeline, with summaries occupying the first half.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    pub stage: Stage,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
}

impl ProgressEvent {
    pub fn new(stage: Stage, message: impl Into<String>, progress: f64) -> Self {
        Self {
            stage,
            message: message.into(),
            progress: Some(progress),
        }
    }

    /// Event with no fractional progress, for coarse stage transitions.
    pub fn stage(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
            progress: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            stage: Stage::Error,
            message: message.into(),
            progress: None,
        }
    }
}
