//! Frequency-domain processing: the FFT pipeline, the spectrum container
//! and the peak picker

pub mod peaks;
pub mod pipeline;
pub mod spectrum;

pub use peaks::{peak_pick, peak_pick_sequence, PeakPickError};
pub use pipeline::{FftPipeline, FrequencySpectrum, PipelineError, PipelineParams};
pub use spectrum::{Spectrum, SpectrumError};
