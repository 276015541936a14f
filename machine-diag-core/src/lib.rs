//! # machine-diag-core
//!
//! Audio-acquisition-to-verdict pipeline for machine fault diagnosis.
//!
//! Captures mono 16-bit PCM from a `CaptureDevice` into a streamed WAV file,
//! uploads it as `multipart/form-data` to a remote `/predict` endpoint, and
//! turns whatever JSON (or HTML) comes back into a `DiagnosticResult`.
//! Microphone backends (cpal) implement `CaptureDevice` and plug into the
//! generic `CaptureSession`.
//!
//! ## Architecture
//!
//! ```text
//! machine-diag-core (this crate)
//! ├── traits/       ← CaptureDevice, PcmStream, SampleSink, DiagnosticDelegate, FeatureExtractor
//! ├── models/       ← DiagnosticError, CaptureState, DiagnosticConfig, DiagnosticResult, etc.
//! ├── processing/   ← WAV header codec, CaptureBuffer
//! ├── storage/      ← WavStreamWriter, header patching, checksums
//! ├── upload/       ← endpoint resolution, multipart framing, UploadClient
//! ├── interpret/    ← tolerant response interpreter
//! └── session/      ← CaptureSession (reader thread), DiagnosticPipeline
//! ```

pub mod interpret;
pub mod models;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;
pub mod upload;

// Re-export key types at crate root for convenience.
pub use interpret::response::interpret;
pub use models::config::{DiagnosticConfig, ResponseProfile, DEFAULT_SERVER_URL};
pub use models::diagnostic_result::{DiagnosticResult, Verdict};
pub use models::error::DiagnosticError;
pub use models::recording_result::RecordingResult;
pub use models::state::{CaptureState, PipelineStage, StopReason};
pub use processing::pcm_buffer::CaptureBuffer;
pub use processing::wav_format::{decode_wav, encode_wav, WavError, WavHeader, WavSpec};
pub use session::capture::{CaptureMode, CaptureReport, CaptureSession};
pub use session::pipeline::{ActiveRecording, DiagnosticPipeline};
pub use storage::wav_writer::{patch_wav_file, WavStreamWriter};
pub use traits::capture_device::{CaptureDevice, PcmStream};
pub use traits::diagnostic_delegate::DiagnosticDelegate;
pub use traits::feature_extractor::{FeatureError, FeatureExtractor, FeatureTensor};
pub use traits::sample_sink::SampleSink;
pub use upload::client::UploadClient;
pub use upload::multipart::{MultipartBody, UploadRequest};
