//! cpal microphone capture device.
//!
//! The cpal stream is built on the capture session's reader thread (inside
//! `open`) and never leaves it. Its callback converts each buffer to mono
//! 16-bit PCM at the session's sample rate and hands it over a channel;
//! `read` drains that channel.

use std::sync::Arc;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SampleFormat, SizedSample, StreamConfig};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;

use machine_diag_core::models::error::DiagnosticError;
use machine_diag_core::traits::capture_device::{CaptureDevice, PcmStream};

use crate::conversion;

/// How long `read` waits for a callback before reporting a zero-length read.
const READ_POLL: Duration = Duration::from_millis(100);

/// Names of the host's input devices.
pub fn list_input_devices() -> Result<Vec<String>, DiagnosticError> {
    let host = cpal::default_host();
    let devices = host
        .input_devices()
        .map_err(|e| DiagnosticError::DeviceUnavailable(format!("failed to enumerate inputs: {}", e)))?;
    Ok(devices.filter_map(|d| d.name().ok()).collect())
}

/// Microphone capture through the platform's default cpal host.
#[derive(Debug, Clone, Default)]
pub struct CpalMicrophone {
    device_name: Option<String>,
}

impl CpalMicrophone {
    /// The system default input device.
    pub fn default_device() -> Self {
        Self { device_name: None }
    }

    /// A specific input device, matched by its cpal name.
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            device_name: Some(name.into()),
        }
    }

    fn find_device(&self) -> Result<cpal::Device, DiagnosticError> {
        let host = cpal::default_host();
        match &self.device_name {
            None => host
                .default_input_device()
                .ok_or_else(|| DiagnosticError::DeviceUnavailable("no default input device".into())),
            Some(name) => host
                .input_devices()
                .map_err(|e| DiagnosticError::DeviceUnavailable(e.to_string()))?
                .find(|d| d.name().map(|n| n == *name).unwrap_or(false))
                .ok_or_else(|| DiagnosticError::DeviceUnavailable(format!("input device {:?} not found", name))),
        }
    }
}

impl CaptureDevice for CpalMicrophone {
    type Stream = CpalStream;

    fn name(&self) -> String {
        self.device_name.clone().unwrap_or_else(|| "default input".into())
    }

    fn min_buffer_size(&self, sample_rate: u32) -> Option<usize> {
        conversion::min_buffer_samples(sample_rate)
    }

    fn open(&mut self, sample_rate: u32) -> Result<CpalStream, DiagnosticError> {
        let device = self.find_device()?;
        let (config, format) = choose_config(&device, sample_rate)?;
        log::info!(
            "Opening {:?}: {} Hz, {} channel(s), {:?}",
            device.name().unwrap_or_default(),
            config.sample_rate.0,
            config.channels,
            format
        );
        if config.sample_rate.0 != sample_rate {
            log::warn!(
                "Input runs at {} Hz, resampling to {} Hz",
                config.sample_rate.0,
                sample_rate
            );
        }

        let (tx, rx) = unbounded::<Vec<i16>>();
        let failure = Arc::new(Mutex::new(None));

        let stream = match format {
            SampleFormat::I16 => build_stream::<i16>(&device, &config, sample_rate, tx, Arc::clone(&failure)),
            SampleFormat::U16 => build_stream::<u16>(&device, &config, sample_rate, tx, Arc::clone(&failure)),
            SampleFormat::F32 => build_stream::<f32>(&device, &config, sample_rate, tx, Arc::clone(&failure)),
            other => Err(DiagnosticError::DeviceUnavailable(format!(
                "unsupported sample format {:?}",
                other
            ))),
        }?;

        stream
            .play()
            .map_err(|e| DiagnosticError::DeviceUnavailable(format!("failed to start stream: {}", e)))?;

        Ok(CpalStream {
            _stream: stream,
            rx,
            pending: Vec::new(),
            offset: 0,
            failure,
        })
    }
}

/// An open cpal input stream. Dropping it stops the device.
pub struct CpalStream {
    _stream: cpal::Stream,
    rx: Receiver<Vec<i16>>,
    pending: Vec<i16>,
    offset: usize,
    failure: Arc<Mutex<Option<String>>>,
}

impl PcmStream for CpalStream {
    fn read(&mut self, buf: &mut [i16]) -> Result<usize, DiagnosticError> {
        if let Some(message) = self.failure.lock().take() {
            return Err(DiagnosticError::DeviceUnavailable(message));
        }

        if self.offset >= self.pending.len() {
            match self.rx.recv_timeout(READ_POLL) {
                Ok(chunk) => {
                    self.pending = chunk;
                    self.offset = 0;
                }
                Err(RecvTimeoutError::Timeout) => return Ok(0),
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(DiagnosticError::DeviceUnavailable("input stream closed".into()))
                }
            }
        }

        let available = &self.pending[self.offset..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.offset += n;
        Ok(n)
    }
}

impl Drop for CpalStream {
    fn drop(&mut self) {
        log::debug!("cpal input stream closed");
    }
}

/// Prefer a mono config at the requested rate, then any channel count at that
/// rate, then the device default (resampled).
fn choose_config(device: &cpal::Device, sample_rate: u32) -> Result<(StreamConfig, SampleFormat), DiagnosticError> {
    let target = cpal::SampleRate(sample_rate);
    let supported: Vec<_> = device
        .supported_input_configs()
        .map_err(|e| DiagnosticError::DeviceUnavailable(format!("failed to query input configs: {}", e)))?
        .filter(|c| matches!(c.sample_format(), SampleFormat::I16 | SampleFormat::U16 | SampleFormat::F32))
        .collect();

    let at_rate = |c: &&cpal::SupportedStreamConfigRange| {
        c.min_sample_rate() <= target && c.max_sample_rate() >= target
    };

    if let Some(range) = supported
        .iter()
        .filter(at_rate)
        .find(|c| c.channels() == 1)
        .or_else(|| supported.iter().find(at_rate))
    {
        let config = range.clone().with_sample_rate(target);
        return Ok((config.config(), config.sample_format()));
    }

    let fallback = device
        .default_input_config()
        .map_err(|e| DiagnosticError::DeviceUnavailable(format!("no usable input config: {}", e)))?;
    Ok((fallback.config(), fallback.sample_format()))
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    target_rate: u32,
    tx: Sender<Vec<i16>>,
    failure: Arc<Mutex<Option<String>>>,
) -> Result<cpal::Stream, DiagnosticError>
where
    T: SizedSample + Send + 'static,
    f32: FromSample<T>,
{
    let channels = config.channels as usize;
    let mut resampler = conversion::LinearResampler::new(config.sample_rate.0, target_rate);

    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                let floats: Vec<f32> = data.iter().map(|&s| f32::from_sample_(s)).collect();
                let pcm = conversion::to_mono_i16(&floats, channels, &mut resampler);
                // The receiver is gone once the session has stopped.
                let _ = tx.send(pcm);
            },
            move |err| {
                log::error!("Audio stream error: {}", err);
                *failure.lock() = Some(err.to_string());
            },
            None,
        )
        .map_err(|e| DiagnosticError::DeviceUnavailable(format!("failed to build input stream: {}", e)))
}
