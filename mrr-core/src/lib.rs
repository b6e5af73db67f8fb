//! MRR Workbench - broadband rotational spectroscopy DSP core
//!
//! Time-domain to frequency-domain processing for molecular rotational
//! resonance (MRR) spectroscopy: FID gating, Kaiser windowing, zero-padding
//! and FFT extraction, plus peak picking, Pickett line-list handling and
//! enantiomeric-excess statistics.

pub mod analysis;
pub mod config;
pub mod fid;
pub mod pickett;
pub mod spectrum;

pub use fid::WaveformSample;
pub use pickett::Cat;
pub use spectrum::{FftPipeline, PipelineParams, Spectrum};

/// Round a frequency value to the 4-decimal precision used throughout the
/// MHz-denominated file formats and index arithmetic.
pub(crate) fn round_mhz(value: f64) -> f64 {
    (value * 1e4).round() / 1e4
}
