//! Fractional gating of FID records
//!
//! Truncates a record to its leading fraction, cutting late-time noise
//! before windowing.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GateError {
    #[error("retention fraction must be in (0, 1], got {0}")]
    InvalidFraction(f64),
}

/// Keep the leading fraction of a time-domain record
///
/// # Arguments
/// * `signal` - Input samples
/// * `fraction` - Retention fraction, in (0, 1]
///
/// # Returns
/// The first `round(len × fraction)` samples
pub fn gate(signal: &[f64], fraction: f64) -> Result<Vec<f64>, GateError> {
    if !(fraction > 0.0 && fraction <= 1.0) {
        return Err(GateError::InvalidFraction(fraction));
    }

    let keep = (signal.len() as f64 * fraction).round() as usize;
    Ok(signal[..keep.min(signal.len())].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_fraction_keeps_everything() {
        let signal = vec![1.0, 2.0, 3.0, 4.0];
        assert_eq!(gate(&signal, 1.0).unwrap(), signal);
    }

    #[test]
    fn test_length_is_rounded() {
        let signal: Vec<f64> = (0..1000).map(|n| n as f64).collect();

        // 1000 × 0.5 = 500
        assert_eq!(gate(&signal, 0.5).unwrap().len(), 500);
        // 1000 × 0.3333 = 333.3 → 333
        assert_eq!(gate(&signal, 0.3333).unwrap().len(), 333);
        // 1000 × 0.6667 = 666.7 → 667
        assert_eq!(gate(&signal, 0.6667).unwrap().len(), 667);
    }

    #[test]
    fn test_prefix_is_preserved() {
        let signal = vec![5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        assert_eq!(gate(&signal, 0.5).unwrap(), &[5.0, 6.0, 7.0]);
    }

    #[test]
    fn test_invalid_fraction() {
        let signal = vec![1.0; 10];
        assert!(gate(&signal, 0.0).is_err());
        assert!(gate(&signal, -0.1).is_err());
        assert!(gate(&signal, 1.01).is_err());
        assert!(gate(&signal, f64::NAN).is_err());
    }
}
