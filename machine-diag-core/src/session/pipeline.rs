use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use chrono::Utc;

use crate::interpret::response::interpret;
use crate::models::config::DiagnosticConfig;
use crate::models::diagnostic_result::DiagnosticResult;
use crate::models::error::DiagnosticError;
use crate::models::recording_result::RecordingResult;
use crate::models::state::{PipelineStage, StopReason};
use crate::processing::wav_format::{WavHeader, WavSpec};
use crate::session::capture::{CaptureMode, CaptureReport, CaptureSession};
use crate::storage::wav_writer::{sha256_file, WavStreamWriter};
use crate::traits::capture_device::CaptureDevice;
use crate::traits::diagnostic_delegate::DiagnosticDelegate;
use crate::upload::client::UploadClient;
use crate::upload::endpoint::resolve_predict_url;
use crate::upload::multipart::UploadRequest;

/// Name of the single working capture file inside `output_directory`.
pub const WORKING_FILE_NAME: &str = "machine_diag_recording.wav";

type RecordingWriter = WavStreamWriter<BufWriter<File>>;

/// Record → finalize → upload → interpret, behind one immutable config.
///
/// ```text
/// [CaptureDevice] → CaptureSession → WavStreamWriter ──finalize──▶ file
///                                                                   │
///        DiagnosticResult ◀── interpret ◀── UploadClient ◀──────────┘
/// ```
///
/// Every `diagnose_*` entry point returns a `DiagnosticResult`; failures are
/// carried inside it, never raised.
pub struct DiagnosticPipeline {
    config: DiagnosticConfig,
    client: UploadClient,
    predict_url: String,
}

impl DiagnosticPipeline {
    pub fn new(config: DiagnosticConfig) -> Result<Self, DiagnosticError> {
        config.validate().map_err(DiagnosticError::ConfigurationFailed)?;
        let predict_url = resolve_predict_url(&config.server_url)?;
        let client = UploadClient::new(&config)?;
        log::info!("Diagnostic pipeline ready, endpoint {}", predict_url);
        Ok(Self {
            config,
            client,
            predict_url,
        })
    }

    /// Replace the upload client, e.g. one with a fixed multipart boundary.
    pub fn with_client(mut self, client: UploadClient) -> Self {
        self.client = client;
        self
    }

    pub fn config(&self) -> &DiagnosticConfig {
        &self.config
    }

    /// Fully resolved `/predict` URL uploads go to.
    pub fn predict_url(&self) -> &str {
        &self.predict_url
    }

    /// Path of the working capture file.
    pub fn working_file(&self) -> PathBuf {
        self.config.output_directory.join(WORKING_FILE_NAME)
    }

    /// Upload an in-memory clip and interpret the verdict.
    pub fn diagnose_bytes(&self, filename: &str, bytes: Vec<u8>) -> DiagnosticResult {
        let request = UploadRequest::new(self.predict_url.clone(), filename, bytes);
        self.upload_and_interpret(&request)
    }

    /// Upload an existing file and interpret the verdict.
    pub fn diagnose_file(&self, path: &Path) -> DiagnosticResult {
        let request = match UploadRequest::from_file(self.predict_url.clone(), path) {
            Ok(request) => request,
            Err(e) => {
                log::error!("Cannot read {}: {}", path.display(), e);
                return DiagnosticResult::from_error(e);
            }
        };
        match WavHeader::parse(request.payload()) {
            Ok(header) => log::debug!(
                "{}: {} Hz, {} ch, {} frames",
                request.filename(),
                header.spec.sample_rate,
                header.spec.channels,
                header.frame_count()
            ),
            Err(e) => log::warn!("{} is not a canonical WAV file ({}), uploading as-is", path.display(), e),
        }
        self.upload_and_interpret(&request)
    }

    /// Begin an open-ended recording into the working file. The caller ends
    /// it with `ActiveRecording::stop`.
    pub fn start_recording<D: CaptureDevice>(&self, device: D) -> Result<ActiveRecording<D>, DiagnosticError> {
        self.begin(device, CaptureMode::Streaming)
    }

    /// Record exactly `capture_secs` of audio (or until the device fails)
    /// and finalize the file.
    pub fn record<D: CaptureDevice>(&self, device: D) -> Result<RecordingResult, DiagnosticError> {
        self.begin(device, CaptureMode::FixedQuota(self.config.quota_samples()))?
            .finish()
    }

    /// Record, upload, and interpret in one blocking call.
    pub fn record_and_diagnose<D: CaptureDevice>(&self, device: D) -> DiagnosticResult {
        self.attempt(device, &|_| {})
    }

    /// Run `record_and_diagnose` on a background thread, reporting stages and
    /// the final result to `delegate`. The handle yields the same result.
    pub fn spawn_record_and_diagnose<D: CaptureDevice>(
        self: &Arc<Self>,
        device: D,
        delegate: Arc<dyn DiagnosticDelegate>,
    ) -> Result<thread::JoinHandle<DiagnosticResult>, DiagnosticError> {
        let pipeline = Arc::clone(self);
        thread::Builder::new()
            .name("diagnostic-attempt".into())
            .spawn(move || {
                let result = pipeline.attempt(device, &|stage| delegate.on_stage_changed(stage));
                delegate.on_stage_changed(PipelineStage::Completed);
                delegate.on_result(&result);
                result
            })
            .map_err(|e| DiagnosticError::DeviceUnavailable(format!("failed to spawn diagnostic thread: {}", e)))
    }

    fn begin<D: CaptureDevice>(&self, device: D, mode: CaptureMode) -> Result<ActiveRecording<D>, DiagnosticError> {
        let path = self.working_file();
        let writer = WavStreamWriter::create(&path, WavSpec::mono_16bit(self.config.sample_rate))?;
        let mut session = CaptureSession::new(device, self.config.sample_rate);
        session.start(writer, mode)?;
        Ok(ActiveRecording {
            session,
            path,
            sample_rate: self.config.sample_rate,
        })
    }

    fn attempt<D: CaptureDevice>(&self, device: D, report: &dyn Fn(PipelineStage)) -> DiagnosticResult {
        report(PipelineStage::Listening);
        let recording = match self.record(device) {
            Ok(recording) => recording,
            Err(e) => return DiagnosticResult::from_error(e),
        };
        if let StopReason::DeviceError(reason) = &recording.stop_reason {
            return DiagnosticResult::from_error(DiagnosticError::DeviceUnavailable(reason.clone()));
        }

        report(PipelineStage::Analyzing);
        let request = match UploadRequest::from_file(self.predict_url.clone(), &recording.file_path) {
            Ok(request) => request,
            Err(e) => return DiagnosticResult::from_error(e),
        };

        report(PipelineStage::Uploading);
        self.upload_and_interpret(&request)
    }

    fn upload_and_interpret(&self, request: &UploadRequest) -> DiagnosticResult {
        let result = match self.client.send(request) {
            Ok(body) => interpret(&body, self.config.response_profile),
            Err(e) => {
                log::error!("Upload of {} failed: {}", request.filename(), e);
                DiagnosticResult::from_error(e)
            }
        };
        log::info!("Diagnosis: {} {}", result.label, result.confidence_display);
        result
    }
}

/// A recording in progress, writing into the pipeline's working file.
pub struct ActiveRecording<D: CaptureDevice> {
    session: CaptureSession<D, RecordingWriter>,
    path: PathBuf,
    sample_rate: u32,
}

impl<D: CaptureDevice> ActiveRecording<D> {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn samples_captured(&self) -> u64 {
        self.session.samples_captured()
    }

    /// Whether capture ended on its own (quota met or device failure).
    pub fn is_finished(&self) -> bool {
        self.session.is_finished()
    }

    /// Stop now and finalize whatever was captured. A partial capture is a
    /// valid recording.
    pub fn stop(mut self) -> Result<RecordingResult, DiagnosticError> {
        let report = self.session.stop()?;
        self.complete(report)
    }

    /// Wait for the capture to end on its own, then finalize.
    pub fn finish(mut self) -> Result<RecordingResult, DiagnosticError> {
        let report = self.session.wait()?;
        self.complete(report)
    }

    fn complete(&self, report: Option<CaptureReport<RecordingWriter>>) -> Result<RecordingResult, DiagnosticError> {
        let report = report.ok_or_else(|| DiagnosticError::DeviceUnavailable("recording was not running".into()))?;

        // The reader has been joined, so no sample can land after this.
        let file = report.sink.finalize()?;
        file.get_ref()
            .sync_all()
            .map_err(|e| DiagnosticError::IoFailure(format!("failed to sync recording: {}", e)))?;
        drop(file);

        let checksum = sha256_file(&self.path)?;
        let result = RecordingResult {
            file_path: self.path.clone(),
            sample_count: report.samples_captured,
            duration_secs: report.samples_captured as f64 / self.sample_rate as f64,
            checksum,
            recorded_at: Utc::now(),
            stop_reason: report.stop_reason,
        };
        log::info!(
            "Recording finalized: {} ({} samples, {:.2}s, {})",
            result.file_path.display(),
            result.sample_count,
            result.duration_secs,
            result.stop_reason.label()
        );
        Ok(result)
    }
}
