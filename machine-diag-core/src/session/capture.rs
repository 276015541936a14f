use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};

use crate::models::error::DiagnosticError;
use crate::models::state::{CaptureState, StopReason};
use crate::traits::capture_device::{CaptureDevice, PcmStream};
use crate::traits::sample_sink::SampleSink;

/// How long the reader keeps pulling samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    /// Until `stop()` is called.
    Streaming,
    /// Until exactly this many samples were read, or `stop()`.
    FixedQuota(u64),
}

/// What the reader hands back once it has stopped.
#[derive(Debug)]
pub struct CaptureReport<S> {
    pub sink: S,
    pub samples_captured: u64,
    pub stop_reason: StopReason,
}

struct WorkerOutput<D, S> {
    device: D,
    report: Result<CaptureReport<S>, DiagnosticError>,
}

/// Owns one capture device and drives its samples into a sink on a single
/// background reader thread.
///
/// ```text
/// start(sink) ──▶ [reader thread: open → read loop → release] ──▶ stop()/wait()
///                          │ samples                                  │
///                          ▼                                          ▼
///                        sink ─────────── returned in CaptureReport ──┘
/// ```
///
/// The device is opened on the reader thread and its stream is dropped
/// there, on every exit path, before the reader finishes. `stop()` joins the
/// reader, so every sample read before the stop signal is in the sink by the
/// time `stop()` returns.
pub struct CaptureSession<D: CaptureDevice, S: SampleSink> {
    device: Option<D>,
    sample_rate: u32,
    state: CaptureState,
    samples_captured: Arc<AtomicU64>,
    stop_tx: Option<Sender<()>>,
    worker: Option<thread::JoinHandle<WorkerOutput<D, S>>>,
}

impl<D: CaptureDevice, S: SampleSink> CaptureSession<D, S> {
    pub fn new(device: D, sample_rate: u32) -> Self {
        Self {
            device: Some(device),
            sample_rate,
            state: CaptureState::Idle,
            samples_captured: Arc::new(AtomicU64::new(0)),
            stop_tx: None,
            worker: None,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// Samples delivered to the sink so far.
    pub fn samples_captured(&self) -> u64 {
        self.samples_captured.load(Ordering::SeqCst)
    }

    /// Whether the reader has exited on its own (quota met or device error).
    pub fn is_finished(&self) -> bool {
        self.worker.as_ref().map(|h| h.is_finished()).unwrap_or(false)
    }

    /// Open the device and start reading into `sink`. Transitions: idle → recording.
    pub fn start(&mut self, sink: S, mode: CaptureMode) -> Result<(), DiagnosticError> {
        if !self.state.is_idle() {
            return Err(DiagnosticError::DeviceUnavailable(
                "capture session already started".into(),
            ));
        }
        let device = self
            .device
            .take()
            .ok_or_else(|| DiagnosticError::DeviceUnavailable("device was lost".into()))?;

        let buffer_size = match device.min_buffer_size(self.sample_rate) {
            Some(size) if size > 0 => size,
            _ => {
                let name = device.name();
                self.device = Some(device);
                return Err(DiagnosticError::DeviceUnavailable(format!(
                    "{}: minimum buffer size unavailable at {} Hz",
                    name, self.sample_rate
                )));
            }
        };

        let (stop_tx, stop_rx) = bounded::<()>(1);
        let (ready_tx, ready_rx) = bounded::<Result<(), DiagnosticError>>(1);
        let sample_rate = self.sample_rate;
        let counter = Arc::clone(&self.samples_captured);
        counter.store(0, Ordering::SeqCst);

        let handle = thread::Builder::new()
            .name("capture-reader".into())
            .spawn(move || {
                let mut device = device;
                let stream = match device.open(sample_rate) {
                    Ok(stream) => {
                        let _ = ready_tx.send(Ok(()));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.clone()));
                        return WorkerOutput {
                            device,
                            report: Err(e),
                        };
                    }
                };
                let report = read_loop(stream, sink, buffer_size, mode, &stop_rx, &counter);
                WorkerOutput { device, report }
            })
            .map_err(|e| {
                DiagnosticError::DeviceUnavailable(format!("failed to spawn capture thread: {}", e))
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                log::info!("Capture started at {} Hz ({:?}, buffer {} samples)", sample_rate, mode, buffer_size);
                self.stop_tx = Some(stop_tx);
                self.worker = Some(handle);
                self.state = CaptureState::Recording;
                Ok(())
            }
            Ok(Err(e)) => {
                if let Ok(output) = handle.join() {
                    self.device = Some(output.device);
                }
                log::error!("Capture device failed to open: {}", e);
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(DiagnosticError::DeviceUnavailable(
                    "capture thread exited while opening the device".into(),
                ))
            }
        }
    }

    /// Stop the reader and wait for it to release the device.
    /// Transitions: recording → stopping → stopped.
    ///
    /// Returns `Ok(None)` when there is nothing to stop.
    pub fn stop(&mut self) -> Result<Option<CaptureReport<S>>, DiagnosticError> {
        let Some(handle) = self.worker.take() else {
            return Ok(None);
        };
        self.state = CaptureState::Stopping;
        if let Some(stop_tx) = self.stop_tx.take() {
            // The reader may already be gone; a full or closed channel is fine.
            let _ = stop_tx.try_send(());
        }
        self.join(handle).map(Some)
    }

    /// Wait for a fixed-quota capture to complete on its own.
    ///
    /// In streaming mode this blocks until the device fails; use `stop()`.
    pub fn wait(&mut self) -> Result<Option<CaptureReport<S>>, DiagnosticError> {
        let Some(handle) = self.worker.take() else {
            return Ok(None);
        };
        self.state = CaptureState::Stopping;
        let result = self.join(handle).map(Some);
        self.stop_tx = None;
        result
    }

    /// Give the device back. Stops the reader first if it is still running.
    pub fn into_device(mut self) -> Option<D> {
        let _ = self.stop();
        self.device.take()
    }

    fn join(
        &mut self,
        handle: thread::JoinHandle<WorkerOutput<D, S>>,
    ) -> Result<CaptureReport<S>, DiagnosticError> {
        let joined = handle.join();
        self.state = CaptureState::Stopped;
        match joined {
            Ok(output) => {
                self.device = Some(output.device);
                let report = output.report?;
                log::info!(
                    "Capture stopped: {} samples ({})",
                    report.samples_captured,
                    report.stop_reason.label()
                );
                Ok(report)
            }
            Err(_) => Err(DiagnosticError::DeviceUnavailable(
                "capture thread panicked".into(),
            )),
        }
    }
}

impl<D: CaptureDevice, S: SampleSink> Drop for CaptureSession<D, S> {
    fn drop(&mut self) {
        if self.worker.is_some() {
            if let Err(e) = self.stop() {
                log::warn!("Capture session dropped while recording: {}", e);
            }
        }
    }
}

/// Reader thread body. `stream` is dropped (releasing the device) before
/// this returns, whichever way the loop ends.
fn read_loop<P: PcmStream, S: SampleSink>(
    mut stream: P,
    mut sink: S,
    buffer_size: usize,
    mode: CaptureMode,
    stop_rx: &Receiver<()>,
    counter: &AtomicU64,
) -> Result<CaptureReport<S>, DiagnosticError> {
    let mut buf = vec![0i16; buffer_size];
    let mut captured: u64 = 0;

    let stop_reason = loop {
        let want = match mode {
            CaptureMode::FixedQuota(quota) => {
                let remaining = quota.saturating_sub(captured);
                if remaining == 0 {
                    break StopReason::QuotaReached;
                }
                remaining.min(buf.len() as u64) as usize
            }
            CaptureMode::Streaming => buf.len(),
        };

        match stop_rx.try_recv() {
            Ok(()) | Err(TryRecvError::Disconnected) => break StopReason::Requested,
            Err(TryRecvError::Empty) => {}
        }

        match stream.read(&mut buf[..want]) {
            Ok(0) => thread::yield_now(),
            Ok(n) => {
                let n = n.min(want);
                sink.write_samples(&buf[..n])?;
                captured += n as u64;
                counter.store(captured, Ordering::SeqCst);
            }
            Err(e) => {
                log::warn!("Capture read failed after {} samples: {}", captured, e);
                break StopReason::DeviceError(e.to_string());
            }
        }
    };

    drop(stream);
    log::debug!("Capture device released");

    Ok(CaptureReport {
        sink,
        samples_captured: captured,
        stop_reason,
    })
}
