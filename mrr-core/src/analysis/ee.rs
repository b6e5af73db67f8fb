//! Enantiomeric-excess statistics
//!
//! Combines the top transitions of two species into a full cross-product of
//! normalized intensity ratios. The spread of the resulting ee distribution
//! carries the pairing uncertainty, so the distribution itself is the
//! result, not a single per-transition average.

use super::ratio::IntensityRatioRecord;
use super::{mean, std_dev};
use log::debug;

/// Frequencies closer than this to an omitted frequency are excluded (half
/// of the 4-decimal file quantum).
const OMIT_TOLERANCE_MHZ: f64 = 5e-5;

/// Settings for [`calculate_ee`]
#[derive(Debug, Clone)]
pub struct EeOptions {
    /// Number of strongest records taken from each species (input order is
    /// assumed pre-sorted by intensity)
    pub top_n: usize,
    /// Acceptable B/A ratio range for species A records
    pub ratio_bounds_a: (f64, f64),
    /// Acceptable B/A ratio range for species B records
    pub ratio_bounds_b: (f64, f64),
    /// Enantiomeric excess of the chiral tag itself
    pub tag_ee: f64,
    /// Transition frequencies to exclude (blends, contaminants)
    pub omitted_frequencies: Vec<f64>,
}

impl Default for EeOptions {
    fn default() -> Self {
        Self {
            top_n: 10,
            ratio_bounds_a: (f64::NEG_INFINITY, f64::INFINITY),
            ratio_bounds_b: (f64::NEG_INFINITY, f64::INFINITY),
            tag_ee: 1.0,
            omitted_frequencies: Vec::new(),
        }
    }
}

/// Cross-product ee distribution
#[derive(Debug, Clone)]
pub struct EeDistribution {
    /// One ee value per (species A, species B) record pair, top_n² in total
    pub values: Vec<f64>,
    pub mean: f64,
    pub std_dev: f64,
}

fn passes(
    record: &IntensityRatioRecord,
    bounds: (f64, f64),
    omitted: &[f64],
) -> bool {
    record.ratio >= bounds.0
        && record.ratio <= bounds.1
        && !omitted
            .iter()
            .any(|&f| (f - record.frequency).abs() < OMIT_TOLERANCE_MHZ)
}

/// Enantiomeric excess from two species' intensity-ratio records
///
/// Filters both record sets by their ratio bounds and the omission list,
/// keeps the first `top_n` of each (callers pass records sorted by
/// intensity), and for every cross pair (i, j) computes
///
/// ```text
/// norm = 1 / (Aᵢ.intensity_a / Bⱼ.intensity_a)
/// R    = Aᵢ.intensity_b / Bⱼ.intensity_b
/// R_N  = R × norm
/// ee   = ((R_N − 1) / (R_N + 1)) / tag_ee
/// ```
///
/// yielding `top_n²` values whose spread is the reported uncertainty.
pub fn calculate_ee(
    species_a: &[IntensityRatioRecord],
    species_b: &[IntensityRatioRecord],
    options: &EeOptions,
) -> EeDistribution {
    let top_a: Vec<&IntensityRatioRecord> = species_a
        .iter()
        .filter(|r| passes(r, options.ratio_bounds_a, &options.omitted_frequencies))
        .take(options.top_n)
        .collect();
    let top_b: Vec<&IntensityRatioRecord> = species_b
        .iter()
        .filter(|r| passes(r, options.ratio_bounds_b, &options.omitted_frequencies))
        .take(options.top_n)
        .collect();

    debug!(
        "ee cross-product over {} x {} records",
        top_a.len(),
        top_b.len()
    );

    let mut values = Vec::with_capacity(top_a.len() * top_b.len());
    for a in &top_a {
        for b in &top_b {
            let norm = 1.0 / (a.intensity_a / b.intensity_a);
            let raw = a.intensity_b / b.intensity_b;
            let normalized = raw * norm;
            let ee = ((normalized - 1.0) / (normalized + 1.0)) / options.tag_ee;
            values.push(ee);
        }
    }

    let m = mean(&values);
    let s = std_dev(&values);
    EeDistribution {
        values,
        mean: m,
        std_dev: s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(freq: f64, intensity_a: f64, intensity_b: f64) -> IntensityRatioRecord {
        IntensityRatioRecord::new(freq, intensity_a, intensity_b)
    }

    #[test]
    fn test_single_pair_reference_scenario() {
        // norm = 1/(10/8) = 0.8, R = 5/8 = 0.625, R_N = 0.5,
        // ee = (0.5 − 1)/(0.5 + 1) = −1/3
        let a = vec![record(3000.0, 10.0, 5.0)];
        let b = vec![record(3005.0, 8.0, 8.0)];

        let options = EeOptions {
            top_n: 1,
            ..Default::default()
        };
        let result = calculate_ee(&a, &b, &options);

        assert_eq!(result.values.len(), 1);
        assert!((result.values[0] + 1.0 / 3.0).abs() < 1e-12);
        assert!((result.mean + 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_tag_ee_divides_result() {
        let a = vec![record(3000.0, 10.0, 5.0)];
        let b = vec![record(3005.0, 8.0, 8.0)];

        let options = EeOptions {
            top_n: 1,
            tag_ee: 0.5,
            ..Default::default()
        };
        let result = calculate_ee(&a, &b, &options);
        assert!((result.values[0] + 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_cross_product_size() {
        let a: Vec<_> = (0..5).map(|i| record(3000.0 + i as f64, 10.0, 5.0)).collect();
        let b: Vec<_> = (0..7).map(|i| record(4000.0 + i as f64, 8.0, 8.0)).collect();

        let options = EeOptions {
            top_n: 3,
            ..Default::default()
        };
        let result = calculate_ee(&a, &b, &options);
        assert_eq!(result.values.len(), 9);
    }

    #[test]
    fn test_ratio_bounds_filtering() {
        let a = vec![
            record(3000.0, 10.0, 5.0),  // ratio 0.5
            record(3001.0, 10.0, 30.0), // ratio 3.0, outside bounds
        ];
        let b = vec![record(4000.0, 8.0, 8.0)];

        let options = EeOptions {
            top_n: 2,
            ratio_bounds_a: (0.0, 1.0),
            ..Default::default()
        };
        let result = calculate_ee(&a, &b, &options);
        assert_eq!(result.values.len(), 1);
    }

    #[test]
    fn test_omitted_frequencies_excluded() {
        let a = vec![record(3000.0, 10.0, 5.0), record(3001.0, 10.0, 5.0)];
        let b = vec![record(4000.0, 8.0, 8.0)];

        let options = EeOptions {
            top_n: 2,
            omitted_frequencies: vec![3001.0],
            ..Default::default()
        };
        let result = calculate_ee(&a, &b, &options);
        assert_eq!(result.values.len(), 1);
    }

    #[test]
    fn test_identical_species_give_zero_ee() {
        let a = vec![record(3000.0, 10.0, 4.0)];
        let b = vec![record(4000.0, 10.0, 4.0)];

        let result = calculate_ee(&a, &b, &EeOptions::default());
        assert_eq!(result.values.len(), 1);
        assert!(result.values[0].abs() < 1e-12);
        assert_eq!(result.std_dev, 0.0);
    }
}
