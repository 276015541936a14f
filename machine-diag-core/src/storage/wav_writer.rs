use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::models::error::DiagnosticError;
use crate::processing::wav_format::{
    self, WavHeader, WavSpec, DATA_SIZE_OFFSET, RIFF_SIZE_OFFSET, WAV_HEADER_SIZE,
};
use crate::traits::sample_sink::SampleSink;

/// Streaming WAV writer: provisional header first, samples as they arrive,
/// length fields backpatched on `finalize`.
///
/// ## File Format
/// ```text
/// [44-byte WAV header, data size 0 until finalize]
/// [raw 16-bit little-endian PCM...]
/// ```
pub struct WavStreamWriter<W: Write + Seek> {
    inner: W,
    spec: WavSpec,
    data_bytes: u64,
}

impl WavStreamWriter<BufWriter<File>> {
    /// Create (or truncate) `path` and write the provisional header.
    pub fn create(path: &Path, spec: WavSpec) -> Result<Self, DiagnosticError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    DiagnosticError::IoFailure(format!("failed to create directory: {}", e))
                })?;
            }
        }
        let file = File::create(path)
            .map_err(|e| DiagnosticError::IoFailure(format!("failed to create file: {}", e)))?;
        Self::new(BufWriter::new(file), spec)
    }
}

impl<W: Write + Seek> WavStreamWriter<W> {
    pub fn new(mut inner: W, spec: WavSpec) -> Result<Self, DiagnosticError> {
        spec.validate()?;
        let header = WavHeader::new(spec, 0).encode();
        inner
            .write_all(&header)
            .map_err(|e| DiagnosticError::IoFailure(format!("failed to write wav header: {}", e)))?;
        Ok(Self {
            inner,
            spec,
            data_bytes: 0,
        })
    }

    pub fn spec(&self) -> WavSpec {
        self.spec
    }

    /// Samples appended so far.
    pub fn samples_written(&self) -> u64 {
        self.data_bytes / 2
    }

    pub fn write_samples(&mut self, samples: &[i16]) -> Result<(), DiagnosticError> {
        let added = samples.len() as u64 * 2;
        wav_format::checked_data_size(self.data_bytes + added)?;
        self.inner
            .write_all(&wav_format::samples_to_le_bytes(samples))
            .map_err(|e| DiagnosticError::IoFailure(format!("write failed: {}", e)))?;
        self.data_bytes += added;
        Ok(())
    }

    /// Patch RIFF and data sizes from the bytes actually written and hand
    /// back the underlying writer, positioned at the end of the file.
    pub fn finalize(mut self) -> Result<W, DiagnosticError> {
        let header = WavHeader::new(self.spec, wav_format::checked_data_size(self.data_bytes)?);
        patch_lengths(&mut self.inner, &header)?;
        self.inner
            .seek(SeekFrom::End(0))
            .map_err(|e| DiagnosticError::IoFailure(e.to_string()))?;
        self.inner
            .flush()
            .map_err(|e| DiagnosticError::IoFailure(e.to_string()))?;
        log::debug!(
            "WAV finalized: {} samples, {} data bytes",
            self.samples_written(),
            header.data_size
        );
        Ok(self.inner)
    }
}

impl<W: Write + Seek + Send + 'static> SampleSink for WavStreamWriter<W> {
    fn write_samples(&mut self, samples: &[i16]) -> Result<(), DiagnosticError> {
        WavStreamWriter::write_samples(self, samples)
    }
}

/// Reopen a streamed WAV file and backpatch its length fields from the file
/// size. Works on files whose writer was closed before finalizing.
pub fn patch_wav_file(path: &Path) -> Result<WavHeader, DiagnosticError> {
    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map_err(|e| DiagnosticError::IoFailure(format!("failed to open for patch: {}", e)))?;

    let mut raw = [0u8; WAV_HEADER_SIZE];
    file.read_exact(&mut raw)
        .map_err(|e| DiagnosticError::IoFailure(format!("failed to read wav header: {}", e)))?;
    let parsed = WavHeader::parse(&raw)?;

    let file_len = file
        .metadata()
        .map_err(|e| DiagnosticError::IoFailure(e.to_string()))?
        .len();
    let data_size = wav_format::checked_data_size(file_len - WAV_HEADER_SIZE as u64)?;
    let header = WavHeader::new(parsed.spec, data_size);

    patch_lengths(&mut file, &header)?;
    file.sync_all()
        .map_err(|e| DiagnosticError::IoFailure(e.to_string()))?;
    Ok(header)
}

/// Overwrite the RIFF size (offset 4) and data size (offset 40).
fn patch_lengths<W: Write + Seek>(out: &mut W, header: &WavHeader) -> Result<(), DiagnosticError> {
    out.seek(SeekFrom::Start(RIFF_SIZE_OFFSET))
        .map_err(|e| DiagnosticError::IoFailure(format!("seek failed: {}", e)))?;
    out.write_all(&header.riff_size().to_le_bytes())
        .map_err(|e| DiagnosticError::IoFailure(format!("patch failed: {}", e)))?;

    out.seek(SeekFrom::Start(DATA_SIZE_OFFSET))
        .map_err(|e| DiagnosticError::IoFailure(format!("seek failed: {}", e)))?;
    out.write_all(&header.data_size.to_le_bytes())
        .map_err(|e| DiagnosticError::IoFailure(format!("patch failed: {}", e)))?;
    Ok(())
}

/// Compute SHA-256 hex digest of a file.
pub fn sha256_file(path: &Path) -> Result<String, DiagnosticError> {
    let data = fs::read(path)
        .map_err(|e| DiagnosticError::IoFailure(format!("failed to read file for checksum: {}", e)))?;
    let digest = Sha256::digest(&data);
    Ok(hex_encode(&digest))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
