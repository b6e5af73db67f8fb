//! Zero-padding of windowed FID records
//!
//! Extends the record to a requested total duration to interpolate the
//! frequency-domain grid.

use log::debug;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PadError {
    #[error("sample rate must be positive, got {0}")]
    InvalidSampleRate(f64),

    #[error("total duration must be positive, got {0} s")]
    InvalidDuration(f64),
}

/// Embed a signal at the start of a zero-filled buffer
///
/// # Arguments
/// * `signal` - Windowed input samples
/// * `total_duration_s` - Requested total record length in seconds
/// * `sample_rate` - Sample rate in Hz
///
/// # Returns
/// Buffer of length `round(total_duration_s × sample_rate)`; the signal
/// occupies the front, the remainder is exactly zero. A signal longer than
/// the buffer is silently truncated (known edge case, kept as-is because the
/// caller may rely on it).
pub fn zero_pad(
    signal: &[f64],
    total_duration_s: f64,
    sample_rate: f64,
) -> Result<Vec<f64>, PadError> {
    if !(sample_rate > 0.0) {
        return Err(PadError::InvalidSampleRate(sample_rate));
    }
    if !(total_duration_s > 0.0) {
        return Err(PadError::InvalidDuration(total_duration_s));
    }

    let total_len = (total_duration_s * sample_rate).round() as usize;
    if signal.len() > total_len {
        debug!(
            "zero_pad: signal ({} samples) longer than target buffer ({}), truncating",
            signal.len(),
            total_len
        );
    }

    let mut buffer = vec![0.0; total_len];
    let copy_len = signal.len().min(total_len);
    buffer[..copy_len].copy_from_slice(&signal[..copy_len]);

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_length_is_rounded_duration() {
        let signal = vec![1.0; 10];

        // 80 µs at 25 GS/s = 2_000_000 samples
        let padded = zero_pad(&signal, 80e-6, 25e9).unwrap();
        assert_eq!(padded.len(), 2_000_000);

        // Non-integer product rounds to nearest
        let padded = zero_pad(&signal, 1.5e-6, 9.0e6).unwrap();
        assert_eq!(padded.len(), 14); // 13.5 → 14
    }

    #[test]
    fn test_signal_at_front_zeros_behind() {
        let signal = vec![3.0, -1.0, 2.5];
        let padded = zero_pad(&signal, 1e-6, 10e6).unwrap();

        assert_eq!(padded.len(), 10);
        assert_eq!(&padded[..3], &[3.0, -1.0, 2.5]);
        assert!(padded[3..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_oversized_signal_truncates_silently() {
        let signal: Vec<f64> = (0..20).map(|n| n as f64).collect();
        let padded = zero_pad(&signal, 1e-6, 10e6).unwrap();

        assert_eq!(padded.len(), 10);
        assert_eq!(&padded[..], &signal[..10]);
    }

    #[test]
    fn test_invalid_parameters() {
        let signal = vec![1.0];
        assert!(zero_pad(&signal, 80e-6, 0.0).is_err());
        assert!(zero_pad(&signal, 80e-6, -1.0).is_err());
        assert!(zero_pad(&signal, 0.0, 25e9).is_err());
    }
}
