//! TOML instrument and processing configuration
//!
//! Instead of passing many CLI flags, users can keep per-instrument settings
//! in a config file:
//!
//! ```toml
//! # instrument.toml
//! [devices]
//! awg_address = "TCPIP0::192.168.1.20::inst0::INSTR"
//! oscilloscope_address = "TCPIP0::192.168.1.21::inst0::INSTR"
//!
//! [acquisition]
//! sample_rate = 25.0e9
//! fraction = 0.9
//! kaiser_beta = 9.5
//! total_duration_us = 80.0
//! freq_start_mhz = 2000.0
//! freq_stop_mhz = 8000.0
//! ```

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::spectrum::PipelineParams;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse TOML configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Root configuration structure for instrument.toml files
#[derive(Debug, Default, Deserialize)]
pub struct InstrumentConfig {
    /// Instrument addresses
    #[serde(default)]
    pub devices: DeviceConfig,

    /// Acquisition and processing settings
    #[serde(default)]
    pub acquisition: AcquisitionConfig,
}

/// VISA-style addresses for the acquisition hardware
#[derive(Debug, Default, Deserialize)]
pub struct DeviceConfig {
    /// Arbitrary waveform generator address
    pub awg_address: Option<String>,

    /// Digitizing oscilloscope address
    pub oscilloscope_address: Option<String>,
}

/// Settings for the FID processing pipeline
#[derive(Debug, Default, Deserialize)]
pub struct AcquisitionConfig {
    /// Digitizer sample rate in Hz
    pub sample_rate: Option<f64>,

    /// Retention fraction for FID gating, in (0, 1]
    pub fraction: Option<f64>,

    /// Kaiser window shape parameter β
    pub kaiser_beta: Option<f64>,

    /// Zero-padded record duration in µs
    pub total_duration_us: Option<f64>,

    /// Lower edge of the extracted frequency window, MHz
    pub freq_start_mhz: Option<f64>,

    /// Upper edge of the extracted frequency window, MHz
    pub freq_stop_mhz: Option<f64>,

    /// Keep real and imaginary components alongside the magnitude
    pub full_ft: Option<bool>,
}

/// Default digitizer rate for a 25 GS/s broadband instrument
pub const DEFAULT_SAMPLE_RATE_HZ: f64 = 25.0e9;

impl InstrumentConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Digitizer sample rate, falling back to the instrument default
    pub fn sample_rate(&self) -> f64 {
        self.acquisition.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE_HZ)
    }

    /// Pipeline parameters with config values overriding the defaults
    pub fn pipeline_params(&self) -> PipelineParams {
        let defaults = PipelineParams::default();
        let acq = &self.acquisition;
        PipelineParams {
            fraction: acq.fraction.unwrap_or(defaults.fraction),
            kaiser_beta: acq.kaiser_beta.unwrap_or(defaults.kaiser_beta),
            total_duration_us: acq.total_duration_us.unwrap_or(defaults.total_duration_us),
            freq_start_mhz: acq.freq_start_mhz.unwrap_or(defaults.freq_start_mhz),
            freq_stop_mhz: acq.freq_stop_mhz.unwrap_or(defaults.freq_stop_mhz),
            full_ft: acq.full_ft.unwrap_or(defaults.full_ft),
        }
    }
}
