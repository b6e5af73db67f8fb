//! # MRR Workbench
//!
//! Command-line front end for the broadband rotational spectroscopy core:
//! FID-to-spectrum transforms, peak picking, catalog simulation and
//! prediction-to-experiment intensity scaling.
//!
//! ## Usage
//!
//! ```bash
//! # Transform a time-domain capture into an .ft spectrum
//! mrr fft capture.txt --sample-rate 25e9 -o capture.ft
//!
//! # Pick peaks above an absolute threshold
//! mrr peaks capture.ft --threshold 0.01
//!
//! # Simulate a predicted spectrum from a .cat line list
//! mrr simulate pred.cat --freq-min 2000 --freq-max 8000 -o pred.ft
//!
//! # Scale predictions to an experimental spectrum
//! mrr scale pred.cat capture.ft assigned.lin
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;

use mrr_workbench::config::InstrumentConfig;
use mrr_workbench::fid::WaveformSample;
use mrr_workbench::pickett::{simulate, Cat, CatFilter, LinFile};
use mrr_workbench::spectrum::{peak_pick, FftPipeline, PipelineParams, Spectrum};

/// MRR Workbench - broadband rotational spectroscopy processing
#[derive(Parser)]
#[command(name = "mrr")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Transform a time-domain FID capture into an .ft spectrum
    Fft {
        /// Input capture file (one or two whitespace-delimited columns)
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output .ft file path (defaults to the input with an .ft extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Digitizer sample rate in Hz
        #[arg(long)]
        sample_rate: Option<f64>,

        /// Instrument TOML config supplying rate and pipeline defaults
        #[arg(long)]
        config: Option<PathBuf>,

        /// Retention fraction for FID gating, in (0, 1]
        #[arg(long)]
        fraction: Option<f64>,

        /// Kaiser window shape parameter
        #[arg(long)]
        kaiser_beta: Option<f64>,

        /// Zero-padded record duration in microseconds
        #[arg(long)]
        total_duration_us: Option<f64>,

        /// Lower edge of the extracted window, MHz
        #[arg(long)]
        freq_start: Option<f64>,

        /// Upper edge of the extracted window, MHz
        #[arg(long)]
        freq_stop: Option<f64>,

        /// Write real and imaginary components instead of the magnitude
        #[arg(long)]
        full_ft: bool,
    },

    /// Pick peaks from an .ft spectrum
    Peaks {
        /// Input .ft file
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Absolute intensity cutoff (mutually exclusive with --dynamic-range)
        #[arg(short, long)]
        threshold: Option<f64>,

        /// Relative cutoff: keep peaks above max / RANGE
        #[arg(short, long)]
        dynamic_range: Option<f64>,

        /// Intensity column to scan (1 = first intensity column)
        #[arg(long, default_value = "1")]
        column: usize,

        /// Sort descending by intensity instead of ascending by frequency
        #[arg(short, long)]
        sort: bool,
    },

    /// Simulate a Gaussian-broadened spectrum from a .cat line list
    Simulate {
        /// Input .cat file
        #[arg(value_name = "CAT")]
        cat: PathBuf,

        /// Output .ft file path
        #[arg(short, long)]
        output: PathBuf,

        /// Lower grid bound, MHz
        #[arg(long)]
        freq_min: f64,

        /// Upper grid bound, MHz
        #[arg(long)]
        freq_max: f64,

        /// Grid spacing, MHz
        #[arg(long, default_value = "0.0125")]
        step_size: f64,

        /// Lineshape full width at half maximum, MHz
        #[arg(long, default_value = "0.060")]
        fwhm: f64,

        /// Drop predictions weaker than max / RANGE before simulating
        #[arg(long)]
        dynamic_range: Option<f64>,

        /// Multiplicative intensity scale
        #[arg(long)]
        scale: Option<f64>,
    },

    /// Scale catalog intensities to an experimental spectrum
    Scale {
        /// Input .cat file
        #[arg(value_name = "CAT")]
        cat: PathBuf,

        /// Experimental .ft spectrum
        #[arg(value_name = "SPECTRUM")]
        spectrum: PathBuf,

        /// Assigned transitions (.lin)
        #[arg(value_name = "LIN")]
        lin: PathBuf,

        /// Frequency match threshold, MHz
        #[arg(long, default_value = "0.030")]
        threshold: f64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    match cli.command {
        Commands::Fft {
            input,
            output,
            sample_rate,
            config,
            fraction,
            kaiser_beta,
            total_duration_us,
            freq_start,
            freq_stop,
            full_ft,
        } => run_fft(
            input,
            output,
            sample_rate,
            config,
            fraction,
            kaiser_beta,
            total_duration_us,
            freq_start,
            freq_stop,
            full_ft,
        ),
        Commands::Peaks {
            input,
            threshold,
            dynamic_range,
            column,
            sort,
        } => run_peaks(input, threshold, dynamic_range, column, sort),
        Commands::Simulate {
            cat,
            output,
            freq_min,
            freq_max,
            step_size,
            fwhm,
            dynamic_range,
            scale,
        } => run_simulate(
            cat,
            output,
            freq_min,
            freq_max,
            step_size,
            fwhm,
            dynamic_range,
            scale,
        ),
        Commands::Scale {
            cat,
            spectrum,
            lin,
            threshold,
        } => run_scale(cat, spectrum, lin, threshold),
    }
}

/// Transform a FID capture and write the spectrum
#[allow(clippy::too_many_arguments)]
fn run_fft(
    input: PathBuf,
    output: Option<PathBuf>,
    sample_rate: Option<f64>,
    config: Option<PathBuf>,
    fraction: Option<f64>,
    kaiser_beta: Option<f64>,
    total_duration_us: Option<f64>,
    freq_start: Option<f64>,
    freq_stop: Option<f64>,
    full_ft: bool,
) -> Result<()> {
    if !input.exists() {
        anyhow::bail!("Input file does not exist: {}", input.display());
    }

    let config = match config {
        Some(path) => InstrumentConfig::from_file(&path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => InstrumentConfig::default(),
    };

    let rate = sample_rate.unwrap_or_else(|| config.sample_rate());
    let defaults = config.pipeline_params();
    let params = PipelineParams {
        fraction: fraction.unwrap_or(defaults.fraction),
        kaiser_beta: kaiser_beta.unwrap_or(defaults.kaiser_beta),
        total_duration_us: total_duration_us.unwrap_or(defaults.total_duration_us),
        freq_start_mhz: freq_start.unwrap_or(defaults.freq_start_mhz),
        freq_stop_mhz: freq_stop.unwrap_or(defaults.freq_stop_mhz),
        full_ft: full_ft || defaults.full_ft,
    };

    let output = output.unwrap_or_else(|| input.with_extension("ft"));

    info!("Input:  {}", input.display());
    info!("Output: {}", output.display());
    info!("Sample rate: {rate} Hz");

    let waveform = WaveformSample::from_file(&input, rate)
        .with_context(|| format!("Failed to read capture {}", input.display()))?;
    info!(
        "Read {} samples ({:.3} us)",
        waveform.len(),
        waveform.duration_s() * 1e6
    );

    let result = FftPipeline::new()
        .process(&waveform, &params)
        .context("FFT pipeline failed")?;
    info!(
        "Spectrum: {} rows at {} MHz resolution",
        result.len(),
        result.resolution_mhz()
    );

    let spectrum = result.into_spectrum().context("Empty frequency window")?;
    spectrum
        .write_ft(&output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    info!("Wrote {}", output.display());
    Ok(())
}

/// Pick and print peaks from an .ft spectrum
fn run_peaks(
    input: PathBuf,
    threshold: Option<f64>,
    dynamic_range: Option<f64>,
    column: usize,
    sort: bool,
) -> Result<()> {
    let spectrum = Spectrum::from_ft_file(&input)
        .with_context(|| format!("Failed to read spectrum {}", input.display()))?;

    let peaks = peak_pick(&spectrum, column, threshold, dynamic_range, sort)
        .context("Peak picking failed")?;

    info!("{} peaks found in {}", peaks.len(), input.display());
    for (freq, intensity) in peaks {
        println!("{freq:.4} {intensity:.8}");
    }
    Ok(())
}

/// Simulate a broadened spectrum from a catalog
#[allow(clippy::too_many_arguments)]
fn run_simulate(
    cat_path: PathBuf,
    output: PathBuf,
    freq_min: f64,
    freq_max: f64,
    step_size: f64,
    fwhm: f64,
    dynamic_range: Option<f64>,
    scale: Option<f64>,
) -> Result<()> {
    let cat = Cat::from_file(&cat_path)
        .with_context(|| format!("Failed to read catalog {}", cat_path.display()))?;
    info!("{} predicted frequencies in {}", cat.len(), cat_path.display());

    let filter = CatFilter {
        freq_min: Some(freq_min),
        freq_max: Some(freq_max),
        dyn_range: dynamic_range,
        ..Default::default()
    };
    let filtered = cat.filter(&filter);
    info!("{} frequencies after filtering", filtered.len());

    let spectrum = simulate(
        &filtered.line_list(),
        freq_min,
        freq_max,
        step_size,
        fwhm,
        scale,
    )
    .context("Simulation failed")?;

    spectrum
        .write_ft_scientific(&output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    info!("Wrote {} rows to {}", spectrum.rows(), output.display());
    Ok(())
}

/// Scale catalog intensities to an experimental spectrum
fn run_scale(
    cat_path: PathBuf,
    spectrum_path: PathBuf,
    lin_path: PathBuf,
    threshold: f64,
) -> Result<()> {
    let cat = Cat::from_file(&cat_path)
        .with_context(|| format!("Failed to read catalog {}", cat_path.display()))?;
    let spectrum = Spectrum::from_ft_file(&spectrum_path)
        .with_context(|| format!("Failed to read spectrum {}", spectrum_path.display()))?;
    let lin = LinFile::from_file(&lin_path)
        .with_context(|| format!("Failed to read assignments {}", lin_path.display()))?;

    info!(
        "{} assignments against {} predicted frequencies",
        lin.assignments.len(),
        cat.len()
    );

    let factor = cat
        .scale_to_spectrum(&spectrum, &lin.frequencies(), threshold)
        .context("Intensity scaling failed")?;

    println!("{factor:.8E}");
    Ok(())
}
