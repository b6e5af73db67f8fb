//! Frequency-indexed intensity arrays
//!
//! A `Spectrum` is a frequency column (strictly increasing, uniform spacing)
//! plus one or more co-registered intensity columns, with O(1) conversion
//! between frequency and row index. This is the interchange type every
//! analysis stage reads and writes, on disk as whitespace-delimited `.ft`
//! text (frequency at 4 decimals, intensities at 8).

use crate::round_mhz;
use log::debug;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpectrumError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{path}:{line}: malformed spectrum row")]
    Malformed { path: String, line: usize },

    #[error("spectrum needs at least two rows to define a point spacing")]
    TooFewRows,

    #[error("spectrum needs at least one intensity column")]
    NoColumns,

    #[error("intensity column length {got} does not match frequency axis length {expected}")]
    ColumnLength { expected: usize, got: usize },
}

/// Multi-column frequency/intensity array
#[derive(Debug, Clone)]
pub struct Spectrum {
    freqs: Vec<f64>,
    columns: Vec<Vec<f64>>,
    point_spacing: f64,
}

impl Spectrum {
    /// Build a spectrum from a frequency axis and intensity columns
    ///
    /// # Arguments
    /// * `freqs` - Frequency axis in MHz, uniformly spaced and increasing
    /// * `columns` - One or more intensity columns, each matching the axis
    pub fn new(freqs: Vec<f64>, columns: Vec<Vec<f64>>) -> Result<Self, SpectrumError> {
        if freqs.len() < 2 {
            return Err(SpectrumError::TooFewRows);
        }
        if columns.is_empty() {
            return Err(SpectrumError::NoColumns);
        }
        for column in &columns {
            if column.len() != freqs.len() {
                return Err(SpectrumError::ColumnLength {
                    expected: freqs.len(),
                    got: column.len(),
                });
            }
        }

        let point_spacing = round_mhz(freqs[1] - freqs[0]);
        Ok(Self {
            freqs,
            columns,
            point_spacing,
        })
    }

    /// Read a spectrum from a whitespace-delimited `.ft`/`.prn` file
    pub fn from_ft_file<P: AsRef<Path>>(path: P) -> Result<Self, SpectrumError> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);

        let mut freqs = Vec::new();
        let mut columns: Vec<Vec<f64>> = Vec::new();

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let values: Option<Vec<f64>> = trimmed
                .split_whitespace()
                .map(|f| f.parse::<f64>().ok())
                .collect();
            let values = values.filter(|v| v.len() >= 2).ok_or_else(|| {
                SpectrumError::Malformed {
                    path: path.display().to_string(),
                    line: index + 1,
                }
            })?;

            if columns.is_empty() {
                columns = vec![Vec::new(); values.len() - 1];
            } else if values.len() - 1 != columns.len() {
                return Err(SpectrumError::Malformed {
                    path: path.display().to_string(),
                    line: index + 1,
                });
            }

            freqs.push(values[0]);
            for (column, &value) in columns.iter_mut().zip(&values[1..]) {
                column.push(value);
            }
        }

        debug!(
            "read {} rows x {} columns from {}",
            freqs.len(),
            columns.len(),
            path.display()
        );
        Self::new(freqs, columns)
    }

    /// Write as `.ft` text: frequency at 4 decimals, intensities at 8
    pub fn write_ft<P: AsRef<Path>>(&self, path: P) -> Result<(), SpectrumError> {
        let mut writer = BufWriter::new(File::create(path)?);
        for row in 0..self.freqs.len() {
            write!(writer, "{:.4}", self.freqs[row])?;
            for column in &self.columns {
                write!(writer, " {:.8}", column[row])?;
            }
            writeln!(writer)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Write with intensities in scientific notation (simulation output)
    pub fn write_ft_scientific<P: AsRef<Path>>(&self, path: P) -> Result<(), SpectrumError> {
        let mut writer = BufWriter::new(File::create(path)?);
        for row in 0..self.freqs.len() {
            write!(writer, "{:.4}", self.freqs[row])?;
            for column in &self.columns {
                write!(writer, " {:.8E}", column[row])?;
            }
            writeln!(writer)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn freqs(&self) -> &[f64] {
        &self.freqs
    }

    pub fn rows(&self) -> usize {
        self.freqs.len()
    }

    /// Number of intensity columns (the frequency axis is not counted)
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Borrow one intensity column (1 = first intensity column)
    pub fn column(&self, column: usize) -> Option<&[f64]> {
        if column == 0 {
            return None;
        }
        self.columns.get(column - 1).map(|c| c.as_slice())
    }

    pub fn point_spacing(&self) -> f64 {
        self.point_spacing
    }

    pub fn freq_min(&self) -> f64 {
        self.freqs[0]
    }

    pub fn freq_max(&self) -> f64 {
        self.freqs[self.freqs.len() - 1]
    }

    /// Nearest row index for a frequency
    ///
    /// No bounds checking: an out-of-range frequency yields an out-of-range
    /// row index. Callers that index with the result take responsibility for
    /// validating the frequency first.
    pub fn freq_to_row(&self, freq: f64) -> i64 {
        ((freq - self.freq_min()) / self.point_spacing).round() as i64
    }

    /// Frequency at a row, rounded to the file precision of 4 decimals
    ///
    /// Exact inverse of [`freq_to_row`](Self::freq_to_row) for in-range rows.
    pub fn row_to_freq(&self, row: i64) -> f64 {
        round_mhz(row as f64 * self.point_spacing + self.freq_min())
    }

    /// Intensity at the row nearest to `freq`
    ///
    /// `column` counts as in the file layout: column 0 is the frequency axis,
    /// column 1 the first intensity column. Out-of-range input propagates as
    /// an index panic to the caller.
    pub fn get_intensity(&self, freq: f64, column: usize) -> f64 {
        let row = self.freq_to_row(freq);
        self.columns[column - 1][row as usize]
    }

    /// One transition's behavior across all columns, peak-normalized
    ///
    /// Returns `[frequency, max_intensity, col1/max, col2/max, ...]` for the
    /// row nearest to `freq`. Used to compare a transition across a batch of
    /// co-registered spectra.
    pub fn normalize_transition(&self, freq: f64) -> Vec<f64> {
        let row = self.freq_to_row(freq) as usize;
        let intensities: Vec<f64> = self.columns.iter().map(|c| c[row]).collect();
        let max = intensities.iter().fold(f64::MIN, |acc, &v| acc.max(v));

        let mut out = Vec::with_capacity(intensities.len() + 2);
        out.push(self.row_to_freq(row as i64));
        out.push(max);
        if max != 0.0 {
            out.extend(intensities.iter().map(|&v| v / max));
        } else {
            out.extend(intensities);
        }
        out
    }

    /// Combine spectra sharing one frequency axis into a single matrix
    ///
    /// Takes the frequency axis from the first spectrum and the first
    /// intensity column of each input. All inputs are assumed co-registered
    /// (identical `freq_min`, `freq_max` and `point_spacing`); only the row
    /// counts are checked.
    pub fn build_matrix(spectra: &[Spectrum]) -> Result<Spectrum, SpectrumError> {
        let first = spectra.first().ok_or(SpectrumError::NoColumns)?;
        let columns: Vec<Vec<f64>> = spectra.iter().map(|s| s.columns[0].clone()).collect();
        Spectrum::new(first.freqs.clone(), columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn uniform_spectrum(freq_min: f64, spacing: f64, rows: usize) -> Spectrum {
        let freqs: Vec<f64> = (0..rows)
            .map(|r| crate::round_mhz(freq_min + r as f64 * spacing))
            .collect();
        let intensity: Vec<f64> = (0..rows).map(|r| r as f64).collect();
        Spectrum::new(freqs, vec![intensity]).unwrap()
    }

    #[test]
    fn test_row_freq_round_trip() {
        let spectrum = uniform_spectrum(2000.0, 0.0125, 4096);
        for row in 0..4096_i64 {
            assert_eq!(spectrum.freq_to_row(spectrum.row_to_freq(row)), row);
        }
    }

    proptest! {
        #[test]
        fn prop_row_freq_round_trip(
            rows in 2_usize..5000,
            start_q in 0_i64..80_000_000,
        ) {
            // 4-decimal-quantized start frequency, instrument point spacing
            let freq_min = start_q as f64 / 1e4;
            let spectrum = uniform_spectrum(freq_min, 0.0125, rows);
            for row in [0, 1, (rows as i64) / 2, rows as i64 - 1] {
                prop_assert_eq!(spectrum.freq_to_row(spectrum.row_to_freq(row)), row);
            }
        }
    }

    #[test]
    fn test_get_intensity() {
        let spectrum = uniform_spectrum(2000.0, 0.0125, 100);
        assert_eq!(spectrum.get_intensity(2000.0, 1), 0.0);
        assert_eq!(spectrum.get_intensity(2000.0125, 1), 1.0);
        // Nearest-row behavior
        assert_eq!(spectrum.get_intensity(2000.0130, 1), 1.0);
    }

    #[test]
    fn test_freq_to_row_no_bounds_check() {
        let spectrum = uniform_spectrum(2000.0, 0.0125, 100);
        // Below range: negative index, no panic at the mapping level
        assert!(spectrum.freq_to_row(1999.0) < 0);
        assert!(spectrum.freq_to_row(9000.0) > 99);
    }

    #[test]
    fn test_normalize_transition() {
        let freqs = vec![100.0, 100.1, 100.2];
        let columns = vec![vec![0.0, 4.0, 0.0], vec![0.0, 2.0, 0.0], vec![0.0, 1.0, 0.0]];
        let spectrum = Spectrum::new(freqs, columns).unwrap();

        let result = spectrum.normalize_transition(100.1);
        assert_eq!(result, vec![100.1, 4.0, 1.0, 0.5, 0.25]);
    }

    #[test]
    fn test_build_matrix() {
        let a = uniform_spectrum(2000.0, 0.0125, 50);
        let b = uniform_spectrum(2000.0, 0.0125, 50);
        let matrix = Spectrum::build_matrix(&[a, b]).unwrap();

        assert_eq!(matrix.num_columns(), 2);
        assert_eq!(matrix.rows(), 50);
    }

    #[test]
    fn test_ft_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spec.ft");

        let spectrum = uniform_spectrum(2000.0, 0.0125, 20);
        spectrum.write_ft(&path).unwrap();

        let read_back = Spectrum::from_ft_file(&path).unwrap();
        assert_eq!(read_back.rows(), 20);
        assert_eq!(read_back.point_spacing(), 0.0125);
        assert_eq!(read_back.freqs(), spectrum.freqs());
    }

    #[test]
    fn test_malformed_ft_names_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.ft");
        std::fs::write(&path, "2000.0000 0.1\n2000.0125 oops\n").unwrap();

        match Spectrum::from_ft_file(&path) {
            Err(SpectrumError::Malformed { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_constructor_rejects_ragged_columns() {
        let freqs = vec![1.0, 2.0, 3.0];
        assert!(Spectrum::new(freqs.clone(), vec![vec![0.0; 2]]).is_err());
        assert!(Spectrum::new(freqs, vec![]).is_err());
    }
}
