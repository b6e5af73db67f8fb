//! Intensity-ratio records for diastereomer/enantiomer comparison
//!
//! Matches transitions across two co-measured spectra (tagged vs. untagged,
//! or two diastereomeric complexes) and records the per-transition intensity
//! ratio, the raw material for enantiomeric-excess statistics.

use super::{mean, std_dev};
use crate::pickett::{Cat, CatFilter};
use crate::spectrum::Spectrum;
use log::debug;

/// Partition tolerance for the peak-pick-only mode: one grid cell of the
/// standard 0.0125 MHz point spacing.
const DOMINANT_MATCH_TOLERANCE_MHZ: f64 = 0.0125;

/// One transition's intensity in two spectra
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntensityRatioRecord {
    /// Transition frequency, MHz
    pub frequency: f64,
    /// Intensity in spectrum A
    pub intensity_a: f64,
    /// Intensity in spectrum B
    pub intensity_b: f64,
    /// B/A intensity ratio
    pub ratio: f64,
}

impl IntensityRatioRecord {
    pub fn new(frequency: f64, intensity_a: f64, intensity_b: f64) -> Self {
        Self {
            frequency,
            intensity_a,
            intensity_b,
            ratio: intensity_b / intensity_a,
        }
    }
}

/// Column selector for [`sigma_filter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatioColumn {
    IntensityA,
    IntensityB,
    Ratio,
}

impl RatioColumn {
    fn value(&self, record: &IntensityRatioRecord) -> f64 {
        match self {
            RatioColumn::IntensityA => record.intensity_a,
            RatioColumn::IntensityB => record.intensity_b,
            RatioColumn::Ratio => record.ratio,
        }
    }
}

/// Per-species ratio records produced by [`transition_scale_factor`]
///
/// In cat-guided mode the two sets belong to species A and species B. In the
/// peak-pick fallback mode, `species_a` holds the dominant partition (peaks
/// present in pick A) and `species_b` the minor one.
#[derive(Debug, Clone, Default)]
pub struct TransitionRatios {
    pub species_a: Vec<IntensityRatioRecord>,
    pub species_b: Vec<IntensityRatioRecord>,
}

/// Build per-species intensity-ratio records from two spectra
///
/// Two modes:
/// - **Cat-guided** (both catalogs supplied): each catalog is filtered with
///   `cat_filter` and matched against `peak_pick_b` within `freq_match`;
///   records carry the intensities of both spectra at the matched
///   experimental frequencies. Match multiplicity is kept.
/// - **Peak-pick-only** (no catalogs): `peak_pick_b` is partitioned into
///   dominant/minor by presence in `peak_pick_a` within one grid cell
///   (±0.0125 MHz). A heuristic fallback; unreliable for low-enantiopurity
///   samples.
///
/// Out-of-range matched frequencies propagate as index panics from
/// [`Spectrum::get_intensity`]; validate the picks against the spectra first.
#[allow(clippy::too_many_arguments)]
pub fn transition_scale_factor(
    spectrum_a: &Spectrum,
    spectrum_b: &Spectrum,
    peak_pick_a: &[(f64, f64)],
    peak_pick_b: &[(f64, f64)],
    freq_match: f64,
    cat_a: Option<&Cat>,
    cat_b: Option<&Cat>,
    cat_filter: &CatFilter,
) -> TransitionRatios {
    let record_at = |freq: f64| {
        IntensityRatioRecord::new(
            freq,
            spectrum_a.get_intensity(freq, 1),
            spectrum_b.get_intensity(freq, 1),
        )
    };

    if let (Some(cat_a), Some(cat_b)) = (cat_a, cat_b) {
        let matched = |cat: &Cat| -> Vec<IntensityRatioRecord> {
            cat.filter(cat_filter)
                .spectrum_matches(peak_pick_b, freq_match)
                .into_iter()
                .map(|(exp_freq, _)| record_at(exp_freq))
                .collect()
        };

        let species_a = matched(cat_a);
        let species_b = matched(cat_b);
        debug!(
            "cat-guided ratios: {} species-A records, {} species-B records",
            species_a.len(),
            species_b.len()
        );
        return TransitionRatios {
            species_a,
            species_b,
        };
    }

    // Fallback: partition pick B by presence in pick A
    let mut dominant = Vec::new();
    let mut minor = Vec::new();
    for &(freq, _) in peak_pick_b {
        let present_in_a = peak_pick_a
            .iter()
            .any(|&(fa, _)| (fa - freq).abs() <= DOMINANT_MATCH_TOLERANCE_MHZ);
        if present_in_a {
            dominant.push(record_at(freq));
        } else {
            minor.push(record_at(freq));
        }
    }

    debug!(
        "peak-pick partition: {} dominant, {} minor",
        dominant.len(),
        minor.len()
    );
    TransitionRatios {
        species_a: dominant,
        species_b: minor,
    }
}

/// Single-pass sigma filter on one record column
///
/// The mean and standard deviation are computed once over the input, then
/// every row outside mean ± `sigma_multiplier`·σ is removed. Unlike the
/// iterative catalog trim, this deliberately does not recompute after
/// removal.
pub fn sigma_filter(
    records: &[IntensityRatioRecord],
    column: RatioColumn,
    sigma_multiplier: f64,
) -> Vec<IntensityRatioRecord> {
    let values: Vec<f64> = records.iter().map(|r| column.value(r)).collect();
    let m = mean(&values);
    let s = std_dev(&values);

    records
        .iter()
        .filter(|r| (column.value(r) - m).abs() <= sigma_multiplier * s)
        .copied()
        .collect()
}
