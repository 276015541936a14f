use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::error::DiagnosticError;
use crate::traits::sample_sink::SampleSink;

/// Thread-safe, growable buffer of mono 16-bit samples.
///
/// Clones share the same storage: the capture worker appends through one
/// handle while the controlling thread keeps another to take the samples
/// once the session has stopped.
#[derive(Debug, Clone, Default)]
pub struct CaptureBuffer {
    samples: Arc<Mutex<Vec<i16>>>,
}

impl CaptureBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: Arc::new(Mutex::new(Vec::with_capacity(capacity))),
        }
    }

    pub fn append(&self, samples: &[i16]) {
        if samples.is_empty() {
            return;
        }
        self.samples.lock().extend_from_slice(samples);
    }

    /// Copy of everything captured so far.
    pub fn snapshot(&self) -> Vec<i16> {
        self.samples.lock().clone()
    }

    /// Remove and return everything captured so far.
    pub fn take(&self) -> Vec<i16> {
        std::mem::take(&mut *self.samples.lock())
    }

    pub fn len(&self) -> usize {
        self.samples.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SampleSink for CaptureBuffer {
    fn write_samples(&mut self, samples: &[i16]) -> Result<(), DiagnosticError> {
        self.append(samples);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn append_and_take() {
        let buf = CaptureBuffer::new();
        buf.append(&[1, 2, 3]);
        buf.append(&[]);
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.snapshot(), vec![1, 2, 3]);
        assert_eq!(buf.take(), vec![1, 2, 3]);
        assert!(buf.is_empty());
    }

    #[test]
    fn clones_share_storage_across_threads() {
        let buf = CaptureBuffer::with_capacity(4000);
        let mut writer = buf.clone();
        let handle = thread::spawn(move || {
            for chunk in 0..40 {
                let samples = vec![chunk as i16; 100];
                writer.write_samples(&samples).unwrap();
            }
        });
        handle.join().unwrap();

        let samples = buf.take();
        assert_eq!(samples.len(), 4000);
        assert_eq!(samples[0], 0);
        assert_eq!(samples[3999], 39);
    }
}
