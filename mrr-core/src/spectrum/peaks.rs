//! Peak picking
//!
//! Extracts local maxima from a spectrum above an absolute intensity
//! threshold or a dynamic-range threshold relative to the strongest signal.

use super::spectrum::Spectrum;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PeakPickError {
    #[error("supply either an absolute threshold or a dynamic range")]
    MissingThreshold,

    #[error("absolute threshold and dynamic range are mutually exclusive")]
    ConflictingThreshold,

    #[error("dynamic range must be positive, got {0}")]
    InvalidDynamicRange(f64),

    #[error("column {0} out of range")]
    BadColumn(usize),
}

fn column_slice(spectrum: &Spectrum, column: usize) -> Result<&[f64], PeakPickError> {
    spectrum
        .column(column)
        .ok_or(PeakPickError::BadColumn(column))
}

fn cutoff_for(
    intensities: &[f64],
    threshold: Option<f64>,
    dynamic_range: Option<f64>,
) -> Result<f64, PeakPickError> {
    match (threshold, dynamic_range) {
        (Some(_), Some(_)) => Err(PeakPickError::ConflictingThreshold),
        (None, None) => Err(PeakPickError::MissingThreshold),
        (Some(t), None) => Ok(t),
        (None, Some(d)) => {
            if !(d > 0.0) {
                return Err(PeakPickError::InvalidDynamicRange(d));
            }
            let max = intensities.iter().fold(f64::MIN, |acc, &v| acc.max(v));
            Ok(max / d)
        }
    }
}

/// Row indices of local maxima above the cutoff
fn peak_rows(intensities: &[f64], cutoff: f64) -> Vec<usize> {
    let mut rows = Vec::new();
    for i in 1..intensities.len().saturating_sub(1) {
        if intensities[i] > intensities[i - 1]
            && intensities[i] > intensities[i + 1]
            && intensities[i] > cutoff
        {
            rows.push(i);
        }
    }
    rows
}

/// Pick peaks from one column of a spectrum
///
/// Exactly one of `threshold` (absolute, spectrum intensity units) and
/// `dynamic_range` (relative: cutoff is `max_intensity / dynamic_range`)
/// must be supplied; supplying both is an explicit error rather than a
/// silent preference.
///
/// # Arguments
/// * `spectrum` - Input spectrum
/// * `column` - Intensity column (1 = first intensity column)
/// * `threshold` - Absolute intensity cutoff
/// * `dynamic_range` - Relative cutoff w.r.t. the column maximum
/// * `sort` - Sort descending by intensity instead of ascending by frequency
///
/// # Returns
/// (frequency, intensity) pairs for every local maximum above the cutoff
pub fn peak_pick(
    spectrum: &Spectrum,
    column: usize,
    threshold: Option<f64>,
    dynamic_range: Option<f64>,
    sort: bool,
) -> Result<Vec<(f64, f64)>, PeakPickError> {
    let intensities = column_slice(spectrum, column)?;
    let cutoff = cutoff_for(intensities, threshold, dynamic_range)?;

    let mut peaks: Vec<(f64, f64)> = peak_rows(intensities, cutoff)
        .into_iter()
        .map(|row| (spectrum.row_to_freq(row as i64), intensities[row]))
        .collect();

    if sort {
        peaks.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    }

    Ok(peaks)
}

/// Pick peaks across every column of a measurement sequence
///
/// Scans each column of a multi-spectrum matrix independently, unions the
/// peak rows found in any column, and merges adjacent rows (within one row of
/// each other) into a single representative. The representative is the row
/// holding the strongest signal in any column over the merged row range, so a
/// transition that lands on slightly different rows across repeated
/// measurements is counted once.
///
/// # Returns
/// Sorted row indices of the merged peaks
pub fn peak_pick_sequence(
    matrix: &Spectrum,
    threshold: Option<f64>,
    dynamic_range: Option<f64>,
) -> Result<Vec<usize>, PeakPickError> {
    let mut union: Vec<usize> = Vec::new();
    let mut columns: Vec<&[f64]> = Vec::with_capacity(matrix.num_columns());

    for column in 1..=matrix.num_columns() {
        let intensities = column_slice(matrix, column)?;
        let cutoff = cutoff_for(intensities, threshold, dynamic_range)?;
        union.extend(peak_rows(intensities, cutoff));
        columns.push(intensities);
    }

    union.sort_unstable();
    union.dedup();

    // Strongest signal in any column at a row
    let best_at = |row: usize| -> f64 {
        columns
            .iter()
            .map(|c| c[row])
            .fold(f64::MIN, |acc, v| acc.max(v))
    };

    let mut merged = Vec::new();
    let mut i = 0;
    while i < union.len() {
        let mut j = i;
        while j + 1 < union.len() && union[j + 1] - union[j] <= 1 {
            j += 1;
        }

        // Representative: globally strongest row across the merged range
        let representative = (union[i]..=union[j])
            .max_by(|&a, &b| {
                best_at(a)
                    .partial_cmp(&best_at(b))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(union[i]);
        merged.push(representative);

        i = j + 1;
    }

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spectrum_with(columns: Vec<Vec<f64>>) -> Spectrum {
        let rows = columns[0].len();
        let freqs: Vec<f64> = (0..rows)
            .map(|r| crate::round_mhz(2000.0 + r as f64 * 0.0125))
            .collect();
        Spectrum::new(freqs, columns).unwrap()
    }

    #[test]
    fn test_absolute_threshold() {
        let spectrum = spectrum_with(vec![vec![0.0, 5.0, 0.0, 2.0, 0.0, 9.0, 0.0]]);

        let peaks = peak_pick(&spectrum, 1, Some(1.0), None, false).unwrap();
        let intensities: Vec<f64> = peaks.iter().map(|p| p.1).collect();
        assert_eq!(intensities, vec![5.0, 2.0, 9.0]);

        let peaks = peak_pick(&spectrum, 1, Some(3.0), None, false).unwrap();
        let intensities: Vec<f64> = peaks.iter().map(|p| p.1).collect();
        assert_eq!(intensities, vec![5.0, 9.0]);
    }

    #[test]
    fn test_threshold_monotonicity() {
        let intensities: Vec<f64> = (0..200)
            .map(|n| ((n as f64) * 0.7).sin().abs() * (n as f64 % 13.0))
            .collect();
        let spectrum = spectrum_with(vec![intensities]);

        let mut previous = usize::MAX;
        for threshold in [0.0, 1.0, 2.0, 5.0, 8.0, 12.0] {
            let count = peak_pick(&spectrum, 1, Some(threshold), None, false)
                .unwrap()
                .len();
            assert!(count <= previous);
            previous = count;
        }
    }

    #[test]
    fn test_dynamic_range_floor() {
        let spectrum = spectrum_with(vec![vec![0.0, 10.0, 0.0, 3.0, 0.0, 1.0, 0.0]]);

        let peaks = peak_pick(&spectrum, 1, None, Some(5.0), false).unwrap();
        // Cutoff = 10/5 = 2: the 1.0 peak is excluded
        assert_eq!(peaks.len(), 2);
        assert!(peaks.iter().all(|p| p.1 >= 10.0 / 5.0));
    }

    #[test]
    fn test_sorted_descending() {
        let spectrum = spectrum_with(vec![vec![0.0, 2.0, 0.0, 9.0, 0.0, 5.0, 0.0]]);
        let peaks = peak_pick(&spectrum, 1, Some(1.0), None, true).unwrap();
        let intensities: Vec<f64> = peaks.iter().map(|p| p.1).collect();
        assert_eq!(intensities, vec![9.0, 5.0, 2.0]);
    }

    #[test]
    fn test_threshold_xor_contract() {
        let spectrum = spectrum_with(vec![vec![0.0, 1.0, 0.0]]);

        assert!(matches!(
            peak_pick(&spectrum, 1, None, None, false),
            Err(PeakPickError::MissingThreshold)
        ));
        assert!(matches!(
            peak_pick(&spectrum, 1, Some(1.0), Some(10.0), false),
            Err(PeakPickError::ConflictingThreshold)
        ));
    }

    #[test]
    fn test_endpoints_are_never_peaks() {
        let spectrum = spectrum_with(vec![vec![9.0, 1.0, 0.0, 1.0, 9.0]]);
        let peaks = peak_pick(&spectrum, 1, Some(0.5), None, false).unwrap();
        assert!(peaks.is_empty());
    }

    #[test]
    fn test_sequence_merges_adjacent_rows() {
        // The same transition lands on row 3 in one measurement and row 4 in
        // the other; row 4 carries the globally strongest signal.
        let col_a = vec![0.0, 0.0, 0.0, 5.0, 0.0, 0.0, 0.0, 2.0, 0.0];
        let col_b = vec![0.0, 0.0, 0.0, 0.0, 7.0, 0.0, 0.0, 0.0, 0.0];
        let matrix = spectrum_with(vec![col_a, col_b]);

        let rows = peak_pick_sequence(&matrix, Some(1.0), None).unwrap();
        assert_eq!(rows, vec![4, 7]);
    }

    #[test]
    fn test_sequence_single_column_matches_peak_pick() {
        let column = vec![0.0, 4.0, 0.0, 6.0, 0.0];
        let matrix = spectrum_with(vec![column]);

        let rows = peak_pick_sequence(&matrix, Some(1.0), None).unwrap();
        assert_eq!(rows, vec![1, 3]);
    }
}
