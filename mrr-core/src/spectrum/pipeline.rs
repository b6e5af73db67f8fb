//! FID-to-spectrum Fourier pipeline
//!
//! Gate, Kaiser-window, zero-pad and transform a time-domain capture, then
//! extract the requested frequency window in MHz. A staged path materializes
//! every intermediate array; a fast path produces numerically identical
//! output from a single reused buffer for batch processing.

use crate::fid::{apply_window, gate, kaiser_window, zero_pad, GateError, PadError, WaveformSample};
use crate::round_mhz;
use crate::spectrum::spectrum::{Spectrum, SpectrumError};
use log::debug;
use num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};
use std::sync::Arc;
use thiserror::Error;

/// Instrument-intensity-unit convention carried over from the digitizer
/// (not mathematically required).
const MAGNITUDE_NORMALIZATION: f64 = 100.0;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Gate(#[from] GateError),

    #[error(transparent)]
    Pad(#[from] PadError),

    #[error("FFT processing failed: {0}")]
    Fft(String),
}

/// Pipeline parameters
#[derive(Debug, Clone)]
pub struct PipelineParams {
    /// Retention fraction for gating, in (0, 1]
    pub fraction: f64,

    /// Kaiser window shape parameter β
    pub kaiser_beta: f64,

    /// Target total record duration in µs (sets the zero-padded length)
    pub total_duration_us: f64,

    /// Lower edge of the extracted frequency window, MHz
    pub freq_start_mhz: f64,

    /// Upper edge of the extracted frequency window, MHz
    pub freq_stop_mhz: f64,

    /// Keep real and imaginary components alongside the magnitude
    pub full_ft: bool,
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self {
            fraction: 1.0,
            kaiser_beta: 9.5,
            total_duration_us: 80.0,
            freq_start_mhz: 2000.0,
            freq_stop_mhz: 8000.0,
            full_ft: false,
        }
    }
}

impl PipelineParams {
    fn total_duration_s(&self) -> f64 {
        self.total_duration_us * 1e-6
    }
}

/// Frequency-domain result of one pipeline run
#[derive(Debug, Clone)]
pub struct FrequencySpectrum {
    freqs: Vec<f64>,
    magnitude: Vec<f64>,
    components: Option<(Vec<f64>, Vec<f64>)>,
    resolution_mhz: f64,
}

impl FrequencySpectrum {
    /// Frequency axis in MHz, rounded to 4 decimals
    pub fn freqs(&self) -> &[f64] {
        &self.freqs
    }

    /// Normalized magnitude, one value per frequency
    pub fn magnitude(&self) -> &[f64] {
        &self.magnitude
    }

    /// Real and imaginary components, present when `full_ft` was requested
    pub fn components(&self) -> Option<(&[f64], &[f64])> {
        self.components
            .as_ref()
            .map(|(re, im)| (re.as_slice(), im.as_slice()))
    }

    /// Frequency resolution Δf in MHz
    pub fn resolution_mhz(&self) -> f64 {
        self.resolution_mhz
    }

    pub fn len(&self) -> usize {
        self.freqs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.freqs.is_empty()
    }

    /// Convert into a [`Spectrum`]: (freq, magnitude) or, for a full
    /// transform, (freq, real, imaginary)
    pub fn into_spectrum(self) -> Result<Spectrum, SpectrumError> {
        let columns = match self.components {
            Some((re, im)) => vec![re, im],
            None => vec![self.magnitude],
        };
        Spectrum::new(self.freqs, columns)
    }
}

/// Reusable FID-to-spectrum processor
///
/// Caches the FFT plan and the transform buffers between runs; plans are
/// re-created only when the padded length changes.
pub struct FftPipeline {
    planner: RealFftPlanner<f64>,
    plan: Option<(usize, Arc<dyn RealToComplex<f64>>)>,
    input: Vec<f64>,
    output: Vec<Complex<f64>>,
}

impl Default for FftPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl FftPipeline {
    pub fn new() -> Self {
        Self {
            planner: RealFftPlanner::new(),
            plan: None,
            input: Vec::new(),
            output: Vec::new(),
        }
    }

    /// Run the pipeline stage by stage
    ///
    /// Gate → window → zero-pad → transform → extract, materializing each
    /// intermediate array. Prefer [`quick_fft`](Self::quick_fft) for batch
    /// work; the two are numerically identical.
    pub fn process(
        &mut self,
        waveform: &WaveformSample,
        params: &PipelineParams,
    ) -> Result<FrequencySpectrum, PipelineError> {
        let gated = gate(waveform.samples(), params.fraction)?;
        let windowed = apply_window(&gated, params.kaiser_beta);
        let padded = zero_pad(&windowed, params.total_duration_s(), waveform.sample_rate())?;

        self.input.clear();
        self.input.extend_from_slice(&padded);
        self.transform(waveform.sample_rate(), params)
    }

    /// Fast path: same four stages without intermediate arrays
    ///
    /// Gating, windowing and padding are fused into one pass over the reused
    /// transform buffer.
    pub fn quick_fft(
        &mut self,
        waveform: &WaveformSample,
        params: &PipelineParams,
    ) -> Result<FrequencySpectrum, PipelineError> {
        if !(params.fraction > 0.0 && params.fraction <= 1.0) {
            return Err(GateError::InvalidFraction(params.fraction).into());
        }
        let sample_rate = waveform.sample_rate();
        if !(sample_rate > 0.0) {
            return Err(PadError::InvalidSampleRate(sample_rate).into());
        }
        if !(params.total_duration_s() > 0.0) {
            return Err(PadError::InvalidDuration(params.total_duration_s()).into());
        }

        let signal = waveform.samples();
        let keep = (signal.len() as f64 * params.fraction).round() as usize;
        let keep = keep.min(signal.len());
        let total_len = (params.total_duration_s() * sample_rate).round() as usize;

        self.input.clear();
        self.input.resize(total_len, 0.0);

        let window = kaiser_window(keep, params.kaiser_beta);
        let copy_len = keep.min(total_len);
        for i in 0..copy_len {
            self.input[i] = signal[i] * window[i];
        }

        self.transform(sample_rate, params)
    }

    fn plan_for(&mut self, n: usize) -> Arc<dyn RealToComplex<f64>> {
        match &self.plan {
            Some((len, plan)) if *len == n => plan.clone(),
            _ => {
                debug!("planning real FFT of length {n}");
                let plan = self.planner.plan_fft_forward(n);
                self.plan = Some((n, plan.clone()));
                plan
            }
        }
    }

    /// Transform `self.input` and extract the requested window
    fn transform(
        &mut self,
        sample_rate: f64,
        params: &PipelineParams,
    ) -> Result<FrequencySpectrum, PipelineError> {
        let n = self.input.len();
        let plan = self.plan_for(n);

        self.output.clear();
        self.output.resize(n / 2 + 1, Complex::new(0.0, 0.0));
        plan.process(&mut self.input, &mut self.output)
            .map_err(|e| PipelineError::Fft(e.to_string()))?;

        // Δf = 1 / (N / sample_rate), reported in MHz at 4 decimals
        let resolution_mhz = round_mhz(sample_rate / n as f64 / 1e6);
        let bins = self.output.len() as i64;

        // f[0] = 0, so the index arithmetic reduces to freq / Δf. A window
        // beyond Nyquist yields an empty or truncated slice, not an error.
        let start = (params.freq_start_mhz / resolution_mhz).round() as i64;
        let stop = (params.freq_stop_mhz / resolution_mhz).round() as i64;
        let start = start.max(0);
        let stop = stop.min(bins - 1);

        if stop < start {
            debug!(
                "requested window [{}, {}] MHz outside transform range, returning empty slice",
                params.freq_start_mhz, params.freq_stop_mhz
            );
            return Ok(FrequencySpectrum {
                freqs: vec![],
                magnitude: vec![],
                components: params.full_ft.then(|| (vec![], vec![])),
                resolution_mhz,
            });
        }

        let slice = &self.output[start as usize..=stop as usize];
        let freqs: Vec<f64> = (start..=stop)
            .map(|i| round_mhz(i as f64 * resolution_mhz))
            .collect();
        let magnitude: Vec<f64> = slice
            .iter()
            .map(|c| c.norm() / MAGNITUDE_NORMALIZATION)
            .collect();
        let components = params.full_ft.then(|| {
            let re = slice.iter().map(|c| c.re / MAGNITUDE_NORMALIZATION).collect();
            let im = slice.iter().map(|c| c.im / MAGNITUDE_NORMALIZATION).collect();
            (re, im)
        });

        Ok(FrequencySpectrum {
            freqs,
            magnitude,
            components,
            resolution_mhz,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    /// 25 MHz tone at 100 MS/s, 1000 samples
    fn tone_waveform() -> WaveformSample {
        let rate = 100e6;
        let samples: Vec<f64> = (0..1000)
            .map(|n| (2.0 * PI * 25e6 * n as f64 / rate).sin())
            .collect();
        WaveformSample::new(samples, rate).unwrap()
    }

    fn test_params() -> PipelineParams {
        PipelineParams {
            fraction: 0.8,
            kaiser_beta: 9.5,
            total_duration_us: 20.0, // N = 2000, Δf = 0.05 MHz
            freq_start_mhz: 10.0,
            freq_stop_mhz: 40.0,
            full_ft: false,
        }
    }

    #[test]
    fn test_fast_path_equivalence() {
        let waveform = tone_waveform();
        let params = test_params();

        let staged = FftPipeline::new().process(&waveform, &params).unwrap();
        let quick = FftPipeline::new().quick_fft(&waveform, &params).unwrap();

        assert_eq!(staged.freqs(), quick.freqs());
        assert_eq!(staged.len(), quick.len());
        for (a, b) in staged.magnitude().iter().zip(quick.magnitude()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_peak_lands_on_tone_frequency() {
        let waveform = tone_waveform();
        let spectrum = FftPipeline::new()
            .process(&waveform, &test_params())
            .unwrap();

        let (peak_idx, _) = spectrum
            .magnitude()
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap())
            .unwrap();
        assert!((spectrum.freqs()[peak_idx] - 25.0).abs() < 0.1);
    }

    #[test]
    fn test_resolution_and_axis() {
        let waveform = tone_waveform();
        let spectrum = FftPipeline::new()
            .process(&waveform, &test_params())
            .unwrap();

        // N = 2000 at 100 MS/s → Δf = 0.05 MHz
        assert_eq!(spectrum.resolution_mhz(), 0.05);
        assert_eq!(spectrum.freqs()[0], 10.0);
        assert_eq!(*spectrum.freqs().last().unwrap(), 40.0);
        // Inclusive window: (40 − 10)/0.05 + 1 rows
        assert_eq!(spectrum.len(), 601);
    }

    #[test]
    fn test_magnitude_normalization() {
        // DC record, rectangular window (β = 0), no padding beyond its own
        // length: DC bin magnitude is len / 100
        let waveform = WaveformSample::new(vec![1.0; 1000], 100e6).unwrap();
        let params = PipelineParams {
            fraction: 1.0,
            kaiser_beta: 0.0,
            total_duration_us: 10.0, // N = 1000
            freq_start_mhz: 0.0,
            freq_stop_mhz: 0.0,
            full_ft: false,
        };

        let spectrum = FftPipeline::new().process(&waveform, &params).unwrap();
        assert_eq!(spectrum.len(), 1);
        assert!((spectrum.magnitude()[0] - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_full_ft_components_match_magnitude() {
        let waveform = tone_waveform();
        let params = PipelineParams {
            full_ft: true,
            ..test_params()
        };

        let spectrum = FftPipeline::new().process(&waveform, &params).unwrap();
        let (re, im) = spectrum.components().unwrap();
        for ((&re, &im), &mag) in re.iter().zip(im).zip(spectrum.magnitude()) {
            assert!(((re * re + im * im).sqrt() - mag).abs() < 1e-12);
        }
    }

    #[test]
    fn test_window_beyond_nyquist_is_empty() {
        let waveform = tone_waveform();
        let params = PipelineParams {
            freq_start_mhz: 2000.0,
            freq_stop_mhz: 8000.0,
            ..test_params()
        };

        let spectrum = FftPipeline::new().process(&waveform, &params).unwrap();
        assert!(spectrum.is_empty());
    }

    #[test]
    fn test_invalid_fraction_rejected_by_both_paths() {
        let waveform = tone_waveform();
        let params = PipelineParams {
            fraction: 1.5,
            ..test_params()
        };

        assert!(FftPipeline::new().process(&waveform, &params).is_err());
        assert!(FftPipeline::new().quick_fft(&waveform, &params).is_err());
    }

    #[test]
    fn test_plan_reuse_across_runs() {
        let waveform = tone_waveform();
        let params = test_params();
        let mut pipeline = FftPipeline::new();

        let first = pipeline.process(&waveform, &params).unwrap();
        let second = pipeline.quick_fft(&waveform, &params).unwrap();
        assert_eq!(first.freqs(), second.freqs());
        for (a, b) in first.magnitude().iter().zip(second.magnitude()) {
            assert!((a - b).abs() < 1e-12);
        }
    }
}
