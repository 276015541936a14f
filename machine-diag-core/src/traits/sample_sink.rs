use crate::models::error::DiagnosticError;

/// Destination for captured PCM samples.
///
/// The capture worker owns the sink while recording and hands it back when
/// the session stops, so no other component writes to it concurrently.
pub trait SampleSink: Send + 'static {
    fn write_samples(&mut self, samples: &[i16]) -> Result<(), DiagnosticError>;
}

impl SampleSink for Vec<i16> {
    fn write_samples(&mut self, samples: &[i16]) -> Result<(), DiagnosticError> {
        self.extend_from_slice(samples);
        Ok(())
    }
}
