//! Raw FID records and the capture-source boundary
//!
//! A waveform is one digitizer record: real-valued amplitudes at a uniform
//! sample rate. The sample rate is not stored in waveform files and must be
//! known out-of-band.

use log::debug;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{path}:{line}: not a numeric sample")]
    Malformed { path: String, line: usize },

    #[error("waveform file contains no samples: {0}")]
    Empty(String),

    #[error("sample rate must be positive, got {0}")]
    InvalidSampleRate(f64),

    #[error("instrument unreachable: {0}")]
    InstrumentUnreachable(String),
}

/// One captured time-domain record
#[derive(Debug, Clone)]
pub struct WaveformSample {
    samples: Vec<f64>,
    sample_rate: f64,
}

impl WaveformSample {
    /// Create a waveform from raw samples
    ///
    /// # Arguments
    /// * `samples` - Amplitude sequence (at least one sample)
    /// * `sample_rate` - Sample rate in Hz (must be positive)
    pub fn new(samples: Vec<f64>, sample_rate: f64) -> Result<Self, SourceError> {
        if !(sample_rate > 0.0) {
            return Err(SourceError::InvalidSampleRate(sample_rate));
        }
        if samples.is_empty() {
            return Err(SourceError::Empty("<memory>".into()));
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Load a waveform from a newline-delimited text file
    ///
    /// The standard layout is one amplitude per line. The legacy two-column
    /// layout (time, amplitude) is auto-detected per line and the time column
    /// is discarded.
    pub fn from_file<P: AsRef<Path>>(path: P, sample_rate: f64) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let mut samples = Vec::new();

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let mut fields = trimmed.split_whitespace();
            let first = fields.next();
            let second = fields.next();

            // Two columns means (time, amplitude); keep the amplitude.
            let value = second.or(first).and_then(|f| f.parse::<f64>().ok());
            match value {
                Some(v) => samples.push(v),
                None => {
                    return Err(SourceError::Malformed {
                        path: path.display().to_string(),
                        line: index + 1,
                    })
                }
            }
        }

        if samples.is_empty() {
            return Err(SourceError::Empty(path.display().to_string()));
        }

        debug!(
            "loaded {} samples from {} at {} Hz",
            samples.len(),
            path.display(),
            sample_rate
        );
        Self::new(samples, sample_rate)
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Record duration in seconds
    pub fn duration_s(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate
    }
}

/// Boundary to whatever produces time-domain captures
///
/// Instrument drivers implement this with one synchronous request/response
/// per capture; there is no streaming contract. Driver failures surface as
/// [`SourceError::InstrumentUnreachable`].
pub trait CaptureSource {
    fn acquire(&mut self) -> Result<WaveformSample, SourceError>;
}

/// File-backed capture source
///
/// Replays a stored FID as if it came from the digitizer, for offline
/// processing and tests.
pub struct FileSource {
    path: PathBuf,
    sample_rate: f64,
}

impl FileSource {
    pub fn new<P: Into<PathBuf>>(path: P, sample_rate: f64) -> Self {
        Self {
            path: path.into(),
            sample_rate,
        }
    }
}

impl CaptureSource for FileSource {
    fn acquire(&mut self) -> Result<WaveformSample, SourceError> {
        WaveformSample::from_file(&self.path, self.sample_rate)
    }
}
