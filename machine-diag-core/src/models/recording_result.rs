use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::state::StopReason;

/// Summary of a finalized capture file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordingResult {
    pub file_path: PathBuf,
    pub sample_count: u64,
    pub duration_secs: f64,
    /// SHA-256 of the finalized file, lowercase hex.
    pub checksum: String,
    pub recorded_at: DateTime<Utc>,
    pub stop_reason: StopReason,
}
