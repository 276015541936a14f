//! Interface for turning raw PCM into a model-ready tensor.
//!
//! No transform ships with this crate. Callers that run a model locally
//! supply their own `FeatureExtractor` (typically a mel spectrogram) that
//! produces the shape the model was trained on.

use thiserror::Error;

/// Sample rate the reference model was trained at.
pub const MODEL_SAMPLE_RATE: u32 = 22050;

/// Clip length the reference model was trained on.
pub const MODEL_DURATION_SECS: u32 = 5;

/// Samples the reference model needs (5 s at 22050 Hz).
pub const MODEL_REQUIRED_SAMPLES: usize = (MODEL_SAMPLE_RATE * MODEL_DURATION_SECS) as usize;

/// Reference model input: mel bands × time frames × channels.
pub const MODEL_INPUT_SHAPE: [usize; 3] = [128, 216, 1];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FeatureError {
    #[error("need {required} samples, got {actual}")]
    InsufficientSamples { required: usize, actual: usize },

    #[error("shape {shape:?} holds {expected} values, got {actual}")]
    ShapeMismatch {
        shape: Vec<usize>,
        expected: usize,
        actual: usize,
    },
}

/// Dense row-major f32 tensor with a fixed shape.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTensor {
    shape: Vec<usize>,
    data: Vec<f32>,
}

impl FeatureTensor {
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Result<Self, FeatureError> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(FeatureError::ShapeMismatch {
                shape,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f32> {
        self.data
    }
}

/// Feature extraction capability.
///
/// Implementations must be deterministic: identical input yields an
/// identical tensor.
pub trait FeatureExtractor: Send + Sync {
    /// Minimum number of samples `extract` accepts.
    fn required_samples(&self) -> usize;

    /// Shape of every tensor `extract` returns.
    fn output_shape(&self) -> Vec<usize>;

    fn extract(&self, pcm: &[i16], sample_rate: u32) -> Result<FeatureTensor, FeatureError>;

    /// Reject inputs shorter than `required_samples`.
    fn check_length(&self, pcm: &[i16]) -> Result<(), FeatureError> {
        let required = self.required_samples();
        if pcm.len() < required {
            return Err(FeatureError::InsufficientSamples {
                required,
                actual: pcm.len(),
            });
        }
        Ok(())
    }
}

/// Scale 16-bit PCM to [-1.0, 1.0).
pub fn pcm_to_f32(pcm: &[i16]) -> Vec<f32> {
    pcm.iter().map(|&s| s as f32 / 32768.0).collect()
}

/// Shift and scale in place to zero mean and unit variance.
///
/// An epsilon of 1e-8 is added to the standard deviation so constant input
/// maps to all zeros instead of NaN.
pub fn standardize(values: &mut [f32]) {
    if values.is_empty() {
        return;
    }
    let count = values.len() as f64;
    let mean = values.iter().map(|&v| v as f64).sum::<f64>() / count;
    let variance = values.iter().map(|&v| (v as f64 - mean).powi(2)).sum::<f64>() / count;
    let std = variance.sqrt() + 1e-8;
    for v in values.iter_mut() {
        *v = ((*v as f64 - mean) / std) as f32;
    }
}
