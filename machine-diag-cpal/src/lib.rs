//! # machine-diag-cpal
//!
//! Cross-platform microphone backend for machine-diag, built on cpal.
//!
//! Provides:
//! - `CpalMicrophone`: default (or named) input device as a `CaptureDevice`
//! - `conversion`: downmix, resampling, and float → 16-bit helpers used by
//!   the stream callback
//!
//! The microphone itself is behind the `cpal` feature so the workspace builds
//! on hosts without audio development libraries (ALSA headers on Linux).
//!
//! ## Usage
//! ```ignore
//! use machine_diag_cpal::CpalMicrophone;
//! use machine_diag_core::{DiagnosticConfig, DiagnosticPipeline};
//!
//! let pipeline = DiagnosticPipeline::new(DiagnosticConfig::default())?;
//! let result = pipeline.record_and_diagnose(CpalMicrophone::default_device());
//! ```

pub mod conversion;

#[cfg(feature = "cpal")]
pub mod microphone;

#[cfg(feature = "cpal")]
pub use microphone::{list_input_devices, CpalMicrophone};
