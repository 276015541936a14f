//! Sample conversions between what an input device delivers and the mono
//! 16-bit PCM the capture session expects.

/// Read granularity: 20 ms of audio, never fewer than 256 samples.
pub fn min_buffer_samples(sample_rate: u32) -> Option<usize> {
    if sample_rate == 0 {
        return None;
    }
    Some((sample_rate as usize / 50).max(256))
}

/// Average interleaved frames down to one channel.
pub fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Linear-interpolation resampler that runs across callback boundaries.
///
/// The read position and the previous buffer's last sample carry over, so
/// interpolation between buffers is continuous and no fraction of a sample
/// is lost per callback.
#[derive(Debug, Clone)]
pub struct LinearResampler {
    ratio: f64,
    /// Next read position relative to the start of the upcoming buffer.
    /// -1 addresses `last`.
    position: f64,
    last: Option<f32>,
}

impl LinearResampler {
    pub fn new(source_rate: u32, target_rate: u32) -> Self {
        let ratio = if source_rate == 0 || target_rate == 0 {
            1.0
        } else {
            source_rate as f64 / target_rate as f64
        };
        Self {
            ratio,
            position: 0.0,
            last: None,
        }
    }

    pub fn is_passthrough(&self) -> bool {
        self.ratio == 1.0
    }

    pub fn process(&mut self, samples: &[f32]) -> Vec<f32> {
        if self.is_passthrough() || samples.is_empty() {
            return samples.to_vec();
        }

        let len = samples.len();
        let mut output = Vec::with_capacity((len as f64 / self.ratio) as usize + 1);

        while self.position < (len - 1) as f64 {
            let floor = self.position.floor();
            let frac = (self.position - floor) as f32;
            let (a, b) = if floor < 0.0 {
                (self.last.unwrap_or(samples[0]), samples[0])
            } else {
                let idx = floor as usize;
                (samples[idx], samples[idx + 1])
            };
            output.push(a * (1.0 - frac) + b * frac);
            self.position += self.ratio;
        }

        self.position -= len as f64;
        self.last = Some(samples[len - 1]);
        output
    }
}

/// Clamp to [-1, 1] and scale to `i16`.
pub fn f32_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

/// Full callback path: downmix, resample, quantize.
pub fn to_mono_i16(interleaved: &[f32], channels: usize, resampler: &mut LinearResampler) -> Vec<i16> {
    let mono = downmix(interleaved, channels);
    resampler
        .process(&mono)
        .into_iter()
        .map(f32_to_i16)
        .collect()
}
