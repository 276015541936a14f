use serde::Serialize;

/// Capture session state machine.
///
/// State transitions:
/// ```text
/// idle → recording → stopping → stopped
/// ```
/// A session never leaves `Stopped`; a new attempt uses a new session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Recording,
    Stopping,
    Stopped,
}

impl CaptureState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped)
    }
}

/// Why the background reader stopped pulling samples.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The controlling thread called `stop()`.
    Requested,
    /// Fixed-quota mode collected every required sample.
    QuotaReached,
    /// The device reported an unrecoverable read error. Samples read before
    /// the error were still delivered.
    DeviceError(String),
}

impl StopReason {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Requested => "requested",
            Self::QuotaReached => "quota_reached",
            Self::DeviceError(_) => "device_error",
        }
    }
}

/// Progress of a record-and-diagnose attempt, as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Listening,
    Analyzing,
    Uploading,
    Completed,
}

impl PipelineStage {
    pub fn status_text(&self) -> &'static str {
        match self {
            Self::Listening => "Listening...",
            Self::Analyzing => "Analyzing...",
            Self::Uploading => "Uploading...",
            Self::Completed => "Done",
        }
    }
}
