use crate::models::error::DiagnosticError;

/// A microphone (or any mono 16-bit PCM source) that can be opened for
/// blocking reads.
///
/// Implemented by:
/// - `CpalMicrophone` (machine-diag-cpal)
/// - scripted devices in tests
///
/// The device value itself must be `Send` because the capture worker thread
/// opens it. The stream it returns never leaves that thread.
pub trait CaptureDevice: Send + 'static {
    type Stream: PcmStream;

    /// Human-readable device name for logs.
    fn name(&self) -> String;

    /// Smallest read buffer, in samples, the driver accepts at `sample_rate`.
    ///
    /// `None` means the driver could not report one, which makes the device
    /// unusable.
    fn min_buffer_size(&self, sample_rate: u32) -> Option<usize>;

    /// Acquire the device and begin delivering samples.
    fn open(&mut self, sample_rate: u32) -> Result<Self::Stream, DiagnosticError>;
}

/// An open capture stream. Dropping it releases the device.
pub trait PcmStream {
    /// Block until some samples are available and copy them into `buf`.
    ///
    /// Returns the number of samples written, which may be less than
    /// `buf.len()` (a short read) or zero. An error is unrecoverable and ends
    /// the capture.
    fn read(&mut self, buf: &mut [i16]) -> Result<usize, DiagnosticError>;
}
