use thiserror::Error;

/// Errors surfaced by the capture, codec, upload, and interpretation stages.
///
/// Every stage converts its internal failures into one of these kinds before
/// returning, so callers only ever see a value, never a panic.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DiagnosticError {
    #[error("capture device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("i/o failure: {0}")]
    IoFailure(String),

    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("timeout")]
    Timeout,

    #[error("server returned HTTP {status}")]
    ServerError { status: u16 },

    #[error("response could not be parsed: {0}")]
    ParseError(String),

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),
}

impl DiagnosticError {
    /// Short status line shown to the user for this failure kind.
    pub fn status_text(&self) -> String {
        match self {
            Self::DeviceUnavailable(_) => "Mic Error".into(),
            Self::IoFailure(_) => "File Error".into(),
            Self::ConnectionFailed(_) => "Conn Failed".into(),
            Self::Timeout => "Timeout".into(),
            Self::ServerError { status } => format!("Error: {}", status),
            Self::ParseError(_) => "Parse Error".into(),
            Self::ConfigurationFailed(_) => "Config Error".into(),
        }
    }
}

impl From<std::io::Error> for DiagnosticError {
    fn from(e: std::io::Error) -> Self {
        Self::IoFailure(e.to_string())
    }
}
