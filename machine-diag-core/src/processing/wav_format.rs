//! Canonical 44-byte RIFF/WAVE header and 16-bit PCM payload codec.
//!
//! The header is a small record whose derived fields (byte rate, block
//! align, chunk sizes) are computed from the primitives on every encode and
//! never stored, so they cannot disagree.
//!
//! Layout:
//! ```text
//! [0-3]    "RIFF"
//! [4-7]    36 + data_size
//! [8-11]   "WAVE"
//! [12-15]  "fmt "
//! [16-19]  16 (PCM format chunk size)
//! [20-21]  1 (PCM format code)
//! [22-23]  channels
//! [24-27]  sample_rate
//! [28-31]  byte_rate = sample_rate * channels * bits_per_sample / 8
//! [32-33]  block_align = channels * bits_per_sample / 8
//! [34-35]  bits_per_sample
//! [36-39]  "data"
//! [40-43]  data_size
//! ```

use thiserror::Error;

use crate::models::error::DiagnosticError;

/// Size of the standard WAV RIFF header in bytes.
pub const WAV_HEADER_SIZE: usize = 44;

/// Offset of the RIFF chunk size field.
pub const RIFF_SIZE_OFFSET: u64 = 4;

/// Offset of the data chunk size field.
pub const DATA_SIZE_OFFSET: u64 = 40;

const PCM_FORMAT_CODE: u16 = 1;
const FMT_CHUNK_SIZE: u32 = 16;

/// Largest payload whose RIFF size still fits in a u32.
pub const MAX_DATA_SIZE: u64 = u32::MAX as u64 - 36;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WavError {
    #[error("wav data is {0} bytes, shorter than the 44-byte header")]
    TooShort(usize),

    #[error("expected {expected:?} tag at offset {offset}")]
    BadTag { offset: usize, expected: &'static str },

    #[error("unsupported encoding: format {format}, {bits_per_sample} bits")]
    UnsupportedEncoding { format: u16, bits_per_sample: u16 },

    #[error("header declares {declared} data bytes but only {available} follow")]
    Truncated { declared: u32, available: usize },

    #[error("{channels} channel(s) of {bits_per_sample}-bit audio at {sample_rate} Hz does not fit a WAV header")]
    UnrepresentableFormat {
        sample_rate: u32,
        channels: u16,
        bits_per_sample: u16,
    },
}

impl From<WavError> for DiagnosticError {
    fn from(e: WavError) -> Self {
        DiagnosticError::IoFailure(e.to_string())
    }
}

/// Sample format primitives. Everything else in the header derives from these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavSpec {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

impl WavSpec {
    pub fn mono_16bit(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            channels: 1,
            bits_per_sample: 16,
        }
    }

    /// Saturates for formats `validate` rejects.
    pub fn byte_rate(&self) -> u32 {
        u32::try_from(self.wide_byte_rate()).unwrap_or(u32::MAX)
    }

    /// Saturates for formats `validate` rejects.
    pub fn block_align(&self) -> u16 {
        u16::try_from(self.wide_block_align()).unwrap_or(u16::MAX)
    }

    /// Check that the derived header fields are representable.
    pub fn validate(&self) -> Result<(), WavError> {
        let representable = self.channels > 0
            && self.bits_per_sample > 0
            && self.bits_per_sample % 8 == 0
            && self.wide_block_align() <= u16::MAX as u64
            && self.wide_byte_rate() <= u32::MAX as u64;
        if representable {
            Ok(())
        } else {
            Err(WavError::UnrepresentableFormat {
                sample_rate: self.sample_rate,
                channels: self.channels,
                bits_per_sample: self.bits_per_sample,
            })
        }
    }

    fn wide_block_align(&self) -> u64 {
        self.channels as u64 * self.bits_per_sample as u64 / 8
    }

    fn wide_byte_rate(&self) -> u64 {
        self.sample_rate as u64 * self.wide_block_align()
    }
}

/// A parsed or to-be-written WAV header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    pub spec: WavSpec,
    pub data_size: u32,
}

impl WavHeader {
    pub fn new(spec: WavSpec, data_size: u32) -> Self {
        Self { spec, data_size }
    }

    pub fn riff_size(&self) -> u32 {
        self.data_size.saturating_add(36)
    }

    /// Number of whole sample frames in the payload.
    pub fn frame_count(&self) -> u32 {
        match self.spec.block_align() {
            0 => 0,
            align => self.data_size / align as u32,
        }
    }

    pub fn encode(&self) -> [u8; WAV_HEADER_SIZE] {
        let spec = &self.spec;
        let mut header = [0u8; WAV_HEADER_SIZE];

        // RIFF chunk descriptor
        header[0..4].copy_from_slice(b"RIFF");
        header[4..8].copy_from_slice(&self.riff_size().to_le_bytes());
        header[8..12].copy_from_slice(b"WAVE");

        // fmt sub-chunk
        header[12..16].copy_from_slice(b"fmt ");
        header[16..20].copy_from_slice(&FMT_CHUNK_SIZE.to_le_bytes());
        header[20..22].copy_from_slice(&PCM_FORMAT_CODE.to_le_bytes());
        header[22..24].copy_from_slice(&spec.channels.to_le_bytes());
        header[24..28].copy_from_slice(&spec.sample_rate.to_le_bytes());
        header[28..32].copy_from_slice(&spec.byte_rate().to_le_bytes());
        header[32..34].copy_from_slice(&spec.block_align().to_le_bytes());
        header[34..36].copy_from_slice(&spec.bits_per_sample.to_le_bytes());

        // data sub-chunk
        header[36..40].copy_from_slice(b"data");
        header[40..44].copy_from_slice(&self.data_size.to_le_bytes());

        header
    }

    /// Parse the canonical header. Only uncompressed PCM is accepted.
    pub fn parse(bytes: &[u8]) -> Result<Self, WavError> {
        if bytes.len() < WAV_HEADER_SIZE {
            return Err(WavError::TooShort(bytes.len()));
        }
        expect_tag(bytes, 0, "RIFF")?;
        expect_tag(bytes, 8, "WAVE")?;
        expect_tag(bytes, 12, "fmt ")?;
        expect_tag(bytes, 36, "data")?;

        let format = read_u16(bytes, 20);
        let bits_per_sample = read_u16(bytes, 34);
        if format != PCM_FORMAT_CODE || bits_per_sample == 0 || bits_per_sample % 8 != 0 {
            return Err(WavError::UnsupportedEncoding {
                format,
                bits_per_sample,
            });
        }

        let spec = WavSpec {
            sample_rate: read_u32(bytes, 24),
            channels: read_u16(bytes, 22),
            bits_per_sample,
        };
        spec.validate()?;

        Ok(Self {
            spec,
            data_size: read_u32(bytes, 40),
        })
    }
}

/// Encode a complete sample sequence: exact lengths up front, no patch step.
pub fn encode_wav(spec: WavSpec, samples: &[i16]) -> Result<Vec<u8>, DiagnosticError> {
    spec.validate()?;
    let data_size = checked_data_size(samples.len() as u64 * 2)?;
    let mut out = Vec::with_capacity(WAV_HEADER_SIZE + data_size as usize);
    out.extend_from_slice(&WavHeader::new(spec, data_size).encode());
    out.extend_from_slice(&samples_to_le_bytes(samples));
    Ok(out)
}

/// Decode a 16-bit PCM file into its header and samples.
pub fn decode_wav(bytes: &[u8]) -> Result<(WavHeader, Vec<i16>), WavError> {
    let header = WavHeader::parse(bytes)?;
    if header.spec.bits_per_sample != 16 {
        return Err(WavError::UnsupportedEncoding {
            format: PCM_FORMAT_CODE,
            bits_per_sample: header.spec.bits_per_sample,
        });
    }
    let payload = &bytes[WAV_HEADER_SIZE..];
    if payload.len() < header.data_size as usize {
        return Err(WavError::Truncated {
            declared: header.data_size,
            available: payload.len(),
        });
    }
    let samples = payload[..header.data_size as usize]
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    Ok((header, samples))
}

/// Little-endian byte image of 16-bit samples.
pub fn samples_to_le_bytes(samples: &[i16]) -> Vec<u8> {
    let mut data = Vec::with_capacity(samples.len() * 2);
    for sample in samples {
        data.extend_from_slice(&sample.to_le_bytes());
    }
    data
}

/// Narrow a payload length to the u32 the header can carry.
pub fn checked_data_size(data_size: u64) -> Result<u32, DiagnosticError> {
    if data_size > MAX_DATA_SIZE {
        return Err(DiagnosticError::IoFailure(format!(
            "{} bytes of audio exceeds the WAV size limit",
            data_size
        )));
    }
    Ok(data_size as u32)
}

fn expect_tag(bytes: &[u8], offset: usize, expected: &'static str) -> Result<(), WavError> {
    if &bytes[offset..offset + 4] != expected.as_bytes() {
        return Err(WavError::BadTag { offset, expected });
    }
    Ok(())
}

fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([bytes[offset], bytes[offset + 1], bytes[offset + 2], bytes[offset + 3]])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_magic_and_pcm_format() {
        let header = WavHeader::new(WavSpec::mono_16bit(22050), 0).encode();
        assert_eq!(header.len(), 44);
        assert_eq!(&header[0..4], b"RIFF");
        assert_eq!(&header[8..12], b"WAVE");
        assert_eq!(&header[12..16], b"fmt ");
        assert_eq!(&header[36..40], b"data");
        assert_eq!(read_u32(&header, 16), 16);
        assert_eq!(read_u16(&header, 20), 1);
    }

    #[test]
    fn derived_fields_follow_primitives() {
        let spec = WavSpec::mono_16bit(44100);
        let header = WavHeader::new(spec, 8820).encode();

        assert_eq!(read_u16(&header, 22), 1);
        assert_eq!(read_u32(&header, 24), 44100);
        assert_eq!(read_u32(&header, 28), 88200);
        assert_eq!(read_u16(&header, 32), 2);
        assert_eq!(read_u16(&header, 34), 16);
        assert_eq!(read_u32(&header, 4), 36 + 8820);
        assert_eq!(read_u32(&header, 40), 8820);

        let stereo = WavSpec {
            channels: 2,
            ..spec
        };
        assert_eq!(stereo.byte_rate(), 176400);
        assert_eq!(stereo.block_align(), 4);
    }

    #[test]
    fn round_trip_recovers_format_and_samples() {
        for n in [0usize, 1, 7, 1000] {
            let samples: Vec<i16> = (0..n).map(|i| (i as i16).wrapping_mul(37).wrapping_sub(500)).collect();
            let bytes = encode_wav(WavSpec::mono_16bit(16000), &samples).unwrap();

            let riff = read_u32(&bytes, 4);
            let data = read_u32(&bytes, 40);
            assert_eq!(riff as usize, 36 + 2 * n);
            assert_eq!(data as usize, 2 * n);

            let (header, decoded) = decode_wav(&bytes).unwrap();
            assert_eq!(header.spec, WavSpec::mono_16bit(16000));
            assert_eq!(header.frame_count() as usize, n);
            assert_eq!(decoded, samples);
        }
    }

    #[test]
    fn encoded_file_is_readable_by_hound() {
        let samples = [0i16, 1, -1, i16::MAX, i16::MIN, 1234];
        let bytes = encode_wav(WavSpec::mono_16bit(22050), &samples).unwrap();

        let reader = hound::WavReader::new(std::io::Cursor::new(bytes)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 22050);
        assert_eq!(spec.bits_per_sample, 16);
        let read: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(read, samples);
    }

    #[test]
    fn rejects_short_input() {
        assert_eq!(WavHeader::parse(&[0u8; 43]), Err(WavError::TooShort(43)));
    }

    #[test]
    fn rejects_mismatched_tags() {
        let good = WavHeader::new(WavSpec::mono_16bit(8000), 0).encode();
        for (offset, expected) in [(0, "RIFF"), (8, "WAVE"), (12, "fmt "), (36, "data")] {
            let mut bad = good;
            bad[offset] ^= 0x20;
            assert_eq!(WavHeader::parse(&bad), Err(WavError::BadTag { offset, expected }));
        }
    }

    #[test]
    fn rejects_non_pcm_and_truncated_payload() {
        let mut header = WavHeader::new(WavSpec::mono_16bit(8000), 4).encode();
        header[20] = 3; // IEEE float
        assert!(matches!(
            WavHeader::parse(&header),
            Err(WavError::UnsupportedEncoding { format: 3, .. })
        ));

        let mut bytes = WavHeader::new(WavSpec::mono_16bit(8000), 4).encode().to_vec();
        bytes.extend_from_slice(&[1, 0]);
        assert_eq!(
            decode_wav(&bytes).map(|_| ()),
            Err(WavError::Truncated {
                declared: 4,
                available: 2
            })
        );
    }

    fn header_with(sample_rate: u32, channels: u16, bits: u16) -> [u8; 44] {
        let mut header = WavHeader::new(WavSpec::mono_16bit(8000), 0).encode();
        header[22..24].copy_from_slice(&channels.to_le_bytes());
        header[24..28].copy_from_slice(&sample_rate.to_le_bytes());
        header[34..36].copy_from_slice(&bits.to_le_bytes());
        header
    }

    #[test]
    fn wide_but_representable_header_parses() {
        let header = WavHeader::parse(&header_with(8000, 4096, 16)).unwrap();
        assert_eq!(header.spec.block_align(), 8192);
        assert_eq!(header.spec.byte_rate(), 8000 * 8192);
        assert_eq!(header.frame_count(), 0);
    }

    #[test]
    fn rejects_headers_that_cannot_be_represented() {
        assert!(matches!(
            WavHeader::parse(&header_with(8000, 0, 16)),
            Err(WavError::UnrepresentableFormat { channels: 0, .. })
        ));
        assert!(matches!(
            WavHeader::parse(&header_with(8000, 65535, 16)),
            Err(WavError::UnrepresentableFormat { channels: 65535, .. })
        ));
        assert!(matches!(
            WavHeader::parse(&header_with(u32::MAX, 8, 32)),
            Err(WavError::UnrepresentableFormat { .. })
        ));
    }

    #[test]
    fn derived_fields_saturate_instead_of_overflowing() {
        let spec = WavSpec::mono_16bit(300_000_000);
        assert_eq!(spec.byte_rate(), 600_000_000);

        let huge = WavSpec {
            sample_rate: u32::MAX,
            channels: 8,
            bits_per_sample: 32,
        };
        assert_eq!(huge.byte_rate(), u32::MAX);
        assert_eq!(huge.block_align(), 32);
        assert!(huge.validate().is_err());
        assert!(matches!(encode_wav(huge, &[0, 1, 2]), Err(DiagnosticError::IoFailure(_))));
    }

    #[test]
    fn oversized_payload_is_an_io_failure() {
        assert!(checked_data_size(MAX_DATA_SIZE).is_ok());
        assert!(matches!(
            checked_data_size(MAX_DATA_SIZE + 1),
            Err(DiagnosticError::IoFailure(_))
        ));
    }
}
