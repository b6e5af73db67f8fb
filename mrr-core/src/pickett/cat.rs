//! SPCAT `.cat` predicted line lists
//!
//! Parses the fixed-width Pickett catalog format into per-frequency groups of
//! predicted transitions, and provides the filtering, simulation, matching
//! and intensity-scaling operations the analysis stages build on.
//!
//! Frequency keys are quantized to the file precision of 4 decimals (stored
//! as integer tenth-kHz), so transitions that share a printed frequency land
//! in one group without relying on exact float equality.

use crate::analysis::{mean, std_dev};
use crate::round_mhz;
use crate::spectrum::{Spectrum, SpectrumError};
use log::debug;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

/// Fixed column widths of one `.cat` line: frequency, error, log-intensity,
/// degrees of freedom, lower-state energy, upper-state degeneracy, species
/// tag, quantum-number format, then 12 quantum-number fields.
const CAT_WIDTHS: [usize; 20] = [13, 8, 8, 2, 10, 3, 7, 4, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2];

/// Iterative 3σ trims that fail to stabilize within this many passes abort
/// with [`CatError::NoConvergence`].
const MAX_TRIM_ITERATIONS: usize = 50;

#[derive(Error, Debug)]
pub enum CatError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{path}:{line}: malformed catalog entry")]
    Malformed { path: String, line: usize },

    #[error("no predicted lines matched the assigned frequencies")]
    NoMatches,

    #[error("3-sigma trim did not stabilize within {iterations} iterations")]
    NoConvergence { iterations: usize },

    #[error("invalid simulation grid: {0}")]
    InvalidGrid(String),

    #[error(transparent)]
    Spectrum(#[from] SpectrumError),
}

/// Rotational quantum numbers of one state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuantumNumbers {
    pub n: Option<i32>,
    pub ka: Option<i32>,
    pub kc: Option<i32>,
    pub j: Option<i32>,
    pub f1: Option<i32>,
    pub f: Option<i32>,
}

impl QuantumNumbers {
    fn from_fields(fields: &[Option<i32>]) -> Self {
        let get = |i: usize| fields.get(i).copied().flatten();
        Self {
            n: get(0),
            ka: get(1),
            kc: get(2),
            j: get(3),
            f1: get(4),
            f: get(5),
        }
    }
}

/// One predicted transition
#[derive(Debug, Clone)]
pub struct Transition {
    /// Predicted frequency, MHz
    pub frequency: f64,
    /// Predicted frequency error estimate, MHz
    pub uncertainty: f64,
    /// log10 of the integrated intensity
    pub log_intensity: f64,
    /// Degrees of freedom of the partition function
    pub degrees_of_freedom: i32,
    /// Lower-state energy, cm⁻¹
    pub lower_state_energy: f64,
    /// Upper-state degeneracy
    pub upper_degeneracy: i32,
    /// Species tag
    pub species_tag: i32,
    /// Quantum-number format flag
    pub qn_format: i32,
    pub upper: QuantumNumbers,
    pub lower: QuantumNumbers,
}

impl Transition {
    /// Linear intensity, `10^log_intensity`
    pub fn linear_intensity(&self) -> f64 {
        10f64.powf(self.log_intensity)
    }
}

/// Quantum-number bounds and intensity cut for [`Cat::filter`]
///
/// Unsupplied bounds are no-ops. Each quantum-number bound applies to both
/// the upper and the lower state.
#[derive(Debug, Clone, Default)]
pub struct CatFilter {
    pub freq_min: Option<f64>,
    pub freq_max: Option<f64>,
    pub n_max: Option<i32>,
    pub n_min: Option<i32>,
    pub ka_max: Option<i32>,
    pub ka_min: Option<i32>,
    pub kc_max: Option<i32>,
    pub kc_min: Option<i32>,
    pub j_max: Option<i32>,
    pub j_min: Option<i32>,
    pub f1_max: Option<i32>,
    pub f1_min: Option<i32>,
    pub f_max: Option<i32>,
    pub f_min: Option<i32>,
    /// Drop lines weaker than `max_predicted_intensity / dyn_range`
    pub dyn_range: Option<f64>,
}

impl CatFilter {
    fn violates(&self, transition: &Transition, max_linear: f64) -> bool {
        let over = |v: Option<i32>, bound: Option<i32>| {
            matches!((v, bound), (Some(v), Some(b)) if v > b)
        };
        let under = |v: Option<i32>, bound: Option<i32>| {
            matches!((v, bound), (Some(v), Some(b)) if v < b)
        };

        for state in [&transition.upper, &transition.lower] {
            if over(state.n, self.n_max)
                || under(state.n, self.n_min)
                || over(state.ka, self.ka_max)
                || under(state.ka, self.ka_min)
                || over(state.kc, self.kc_max)
                || under(state.kc, self.kc_min)
                || over(state.j, self.j_max)
                || under(state.j, self.j_min)
                || over(state.f1, self.f1_max)
                || under(state.f1, self.f1_min)
                || over(state.f, self.f_max)
                || under(state.f, self.f_min)
            {
                return true;
            }
        }

        if let Some(dyn_range) = self.dyn_range {
            if transition.linear_intensity() < max_linear / dyn_range {
                return true;
            }
        }

        false
    }
}

/// Quantize a frequency in MHz to the 4-decimal key grid
pub fn quantize(freq: f64) -> i64 {
    (freq * 1e4).round() as i64
}

/// Frequency in MHz for a quantized key
pub fn dequantize(key: i64) -> f64 {
    key as f64 / 1e4
}

/// A parsed predicted line list, grouped by quantized frequency
#[derive(Debug, Clone, Default)]
pub struct Cat {
    groups: BTreeMap<i64, Vec<Transition>>,
}

impl Cat {
    /// Parse a `.cat` file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CatError> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let mut groups: BTreeMap<i64, Vec<Transition>> = BTreeMap::new();
        let mut count = 0usize;

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let transition =
                parse_cat_line(&line).ok_or_else(|| CatError::Malformed {
                    path: path.display().to_string(),
                    line: index + 1,
                })?;
            groups
                .entry(quantize(transition.frequency))
                .or_default()
                .push(transition);
            count += 1;
        }

        debug!(
            "parsed {} transitions in {} frequency groups from {}",
            count,
            groups.len(),
            path.display()
        );
        Ok(Self { groups })
    }

    /// Build a catalog directly from transitions (tests, synthetic data)
    pub fn from_transitions(transitions: Vec<Transition>) -> Self {
        let mut groups: BTreeMap<i64, Vec<Transition>> = BTreeMap::new();
        for transition in transitions {
            groups
                .entry(quantize(transition.frequency))
                .or_default()
                .push(transition);
        }
        Self { groups }
    }

    /// Number of frequency groups
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Iterate groups in ascending frequency order
    pub fn groups(&self) -> impl Iterator<Item = (f64, &[Transition])> {
        self.groups
            .iter()
            .map(|(&key, group)| (dequantize(key), group.as_slice()))
    }

    /// Filter by frequency range, quantum-number bounds and dynamic range
    ///
    /// Filtering is per frequency group: a group is dropped whenever ANY of
    /// its transitions violates ANY supplied bound, so near-degenerate
    /// transitions sharing a frequency stand or fall together (coarse-grained
    /// on purpose; downstream matching counts frequencies, not transitions).
    pub fn filter(&self, filter: &CatFilter) -> Cat {
        let in_range = |freq: f64| {
            filter.freq_min.map_or(true, |lo| freq >= lo)
                && filter.freq_max.map_or(true, |hi| freq <= hi)
        };

        // Dynamic-range reference: strongest prediction inside the requested
        // frequency range, so a band-limited filter is self-consistent.
        let max_linear = self
            .groups()
            .filter(|(freq, _)| in_range(*freq))
            .flat_map(|(_, group)| group.iter())
            .map(|t| t.linear_intensity())
            .fold(0.0_f64, f64::max);

        let groups = self
            .groups
            .iter()
            .filter(|(&key, group)| {
                in_range(dequantize(key))
                    && !group.iter().any(|t| filter.violates(t, max_linear))
            })
            .map(|(&key, group)| (key, group.clone()))
            .collect();

        Cat { groups }
    }

    /// Flatten to (frequency, linear intensity) pairs
    ///
    /// A frequency appears once per constituent transition.
    pub fn line_list(&self) -> Vec<(f64, f64)> {
        self.groups()
            .flat_map(|(freq, group)| {
                group
                    .iter()
                    .map(move |t| (freq, t.linear_intensity()))
            })
            .collect()
    }

    /// Match experimental peaks against predicted frequencies
    ///
    /// Records every (experimental, predicted) pair with
    /// `|predicted − experimental| ≤ threshold`. One experimental peak may
    /// match several predicted keys; duplicates are kept, since downstream
    /// statistics depend on the multiplicity.
    pub fn spectrum_matches(&self, peak_pick: &[(f64, f64)], threshold: f64) -> Vec<(f64, f64)> {
        let mut pairs = Vec::new();
        for &(exp_freq, _) in peak_pick {
            for (pred_freq, _) in self.groups() {
                if (pred_freq - exp_freq).abs() <= threshold {
                    pairs.push((exp_freq, pred_freq));
                }
            }
        }
        pairs
    }

    /// Intensity scale factor between this prediction and a spectrum
    ///
    /// For every predicted frequency within `threshold` of an assigned
    /// frequency, computes `experimental / predicted` (transitions sharing a
    /// key sum their linear intensities), then 3σ-trims the ratio set until a
    /// pass removes nothing and returns the trimmed mean.
    pub fn scale_to_spectrum(
        &self,
        target: &Spectrum,
        assigned: &[f64],
        threshold: f64,
    ) -> Result<f64, CatError> {
        let mut ratios = Vec::new();
        for (pred_freq, group) in self.groups() {
            if assigned.iter().any(|&a| (a - pred_freq).abs() <= threshold) {
                let predicted: f64 = group.iter().map(|t| t.linear_intensity()).sum();
                let experimental = target.get_intensity(pred_freq, 1);
                ratios.push(experimental / predicted);
            }
        }

        if ratios.is_empty() {
            return Err(CatError::NoMatches);
        }
        iterative_sigma_trim(ratios, 3.0)
    }
}

/// Repeatedly drop values outside mean ± kσ until a pass removes nothing
///
/// Returns the mean of the stable set. Bounded at [`MAX_TRIM_ITERATIONS`];
/// exceeding the bound is a [`CatError::NoConvergence`].
pub(crate) fn iterative_sigma_trim(mut values: Vec<f64>, sigma: f64) -> Result<f64, CatError> {
    for _ in 0..MAX_TRIM_ITERATIONS {
        let m = mean(&values);
        let s = std_dev(&values);
        let retained: Vec<f64> = values
            .iter()
            .copied()
            .filter(|v| (v - m).abs() <= sigma * s)
            .collect();

        if retained.len() == values.len() {
            return Ok(m);
        }
        values = retained;
    }
    Err(CatError::NoConvergence {
        iterations: MAX_TRIM_ITERATIONS,
    })
}

/// Convolve a line list with a Gaussian lineshape on a uniform grid
///
/// Each line contributes only within ±4 half-widths of its center (tail
/// truncation is an accepted approximation). Contributions from nearby lines
/// add on shared grid cells.
///
/// # Arguments
/// * `lines` - (frequency MHz, linear intensity) pairs
/// * `freq_min`, `freq_max` - Grid bounds, MHz
/// * `step_size` - Grid spacing, MHz (0.0125 by convention)
/// * `fwhm` - Lineshape full width at half maximum, MHz (0.060 by convention)
/// * `scale_factor` - Optional multiplicative intensity scale
pub fn simulate(
    lines: &[(f64, f64)],
    freq_min: f64,
    freq_max: f64,
    step_size: f64,
    fwhm: f64,
    scale_factor: Option<f64>,
) -> Result<Spectrum, CatError> {
    if !(step_size > 0.0) {
        return Err(CatError::InvalidGrid(format!(
            "step size must be positive, got {step_size}"
        )));
    }
    if !(fwhm > 0.0) {
        return Err(CatError::InvalidGrid(format!(
            "FWHM must be positive, got {fwhm}"
        )));
    }
    if !(freq_max > freq_min) {
        return Err(CatError::InvalidGrid(format!(
            "empty frequency range [{freq_min}, {freq_max}]"
        )));
    }

    let rows = ((freq_max - freq_min) / step_size).round() as usize + 1;
    let scale = scale_factor.unwrap_or(1.0);
    let half_width = fwhm / 2.0;
    let reach = 4.0 * half_width;
    // Gaussian: exp(-4 ln2 (x-f0)² / fwhm²) has the requested FWHM
    let shape = 4.0 * std::f64::consts::LN_2 / (fwhm * fwhm);

    let mut intensity = vec![0.0; rows];
    for &(center, height) in lines {
        if center < freq_min - reach || center > freq_max + reach {
            continue;
        }
        let lo = (((center - reach - freq_min) / step_size).ceil() as i64).max(0) as usize;
        let hi = ((((center + reach - freq_min) / step_size).floor() as i64).min(rows as i64 - 1))
            .max(0) as usize;
        for (cell, value) in intensity.iter_mut().enumerate().take(hi + 1).skip(lo) {
            let x = freq_min + cell as f64 * step_size;
            let dx = x - center;
            *value += scale * height * (-shape * dx * dx).exp();
        }
    }

    let freqs: Vec<f64> = (0..rows)
        .map(|i| round_mhz(freq_min + i as f64 * step_size))
        .collect();
    Ok(Spectrum::new(freqs, vec![intensity])?)
}

/// Fixed-width field access; absent or blank fields are `None`
fn field(line: &str, start: usize, width: usize) -> Option<&str> {
    let end = (start + width).min(line.len());
    if start >= end {
        return None;
    }
    let raw = line.get(start..end)?.trim();
    if raw.is_empty() {
        None
    } else {
        Some(raw)
    }
}

fn parse_cat_line(line: &str) -> Option<Transition> {
    let mut offsets = [0usize; 20];
    let mut cursor = 0usize;
    for (i, width) in CAT_WIDTHS.iter().enumerate() {
        offsets[i] = cursor;
        cursor += width;
    }

    let freq: f64 = field(line, offsets[0], CAT_WIDTHS[0])?.parse().ok()?;
    let uncertainty: f64 = field(line, offsets[1], CAT_WIDTHS[1])?.parse().ok()?;
    let log_intensity: f64 = field(line, offsets[2], CAT_WIDTHS[2])?.parse().ok()?;
    let degrees_of_freedom: i32 = field(line, offsets[3], CAT_WIDTHS[3])?.parse().ok()?;
    let lower_state_energy: f64 = field(line, offsets[4], CAT_WIDTHS[4])?.parse().ok()?;
    let upper_degeneracy: i32 = field(line, offsets[5], CAT_WIDTHS[5])?.parse().ok()?;
    let species_tag: i32 = field(line, offsets[6], CAT_WIDTHS[6])?.parse().ok()?;
    let qn_format: i32 = field(line, offsets[7], CAT_WIDTHS[7])?.parse().ok()?;

    let mut qn = [None; 12];
    for (i, slot) in qn.iter_mut().enumerate() {
        *slot = field(line, offsets[8 + i], CAT_WIDTHS[8 + i]).and_then(|f| f.parse().ok());
    }

    Some(Transition {
        frequency: freq,
        uncertainty,
        log_intensity,
        degrees_of_freedom,
        lower_state_energy,
        upper_degeneracy,
        species_tag,
        qn_format,
        upper: QuantumNumbers::from_fields(&qn[..6]),
        lower: QuantumNumbers::from_fields(&qn[6..]),
    })
}
