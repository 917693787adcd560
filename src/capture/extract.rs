//! Standalone sample extraction helpers.
//!
//! These operate on the wide sample array from
//! [`read_samples`](crate::capture::read_samples) and are independent of the
//! mode-based channel demultiplexing: any mask, any bit offset, optional
//! inversion, plus a sliding-window median filter for glitch suppression on
//! noisy inputs.

use crate::error::{EngineError, EngineResult};

/// Extract one logic trace from wide samples.
///
/// A sample maps to `1` when `(sample >> offset) & mask` is non-zero,
/// flipped when `invert` is set.
pub fn extract_bits(samples: &[u32], mask: u32, offset: u32, invert: bool) -> Vec<u8> {
    samples
        .iter()
        .map(|&sample| {
            let set = (sample >> offset) & mask != 0;
            (set ^ invert) as u8
        })
        .collect()
}

/// Apply an odd-width sliding-window median filter to a trace.
///
/// The window is clamped at the trace edges. Width 1 is the identity;
/// even or zero widths are rejected.
pub fn median_filter(trace: &[u8], window: usize) -> EngineResult<Vec<u8>> {
    if window == 0 || window % 2 == 0 {
        return Err(EngineError::BadParams(format!(
            "median filter window must be odd, got {window}"
        )));
    }
    if window == 1 || trace.is_empty() {
        return Ok(trace.to_vec());
    }

    let half = window / 2;
    let mut out = Vec::with_capacity(trace.len());
    let mut scratch: Vec<u8> = Vec::with_capacity(window);
    for i in 0..trace.len() {
        let lo = i.saturating_sub(half);
        let hi = (i + half + 1).min(trace.len());
        scratch.clear();
        scratch.extend_from_slice(&trace[lo..hi]);
        scratch.sort_unstable();
        out.push(scratch[scratch.len() / 2]);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_single_bit() {
        let samples = [0b0001, 0b0010, 0b0011, 0b0000];
        assert_eq!(extract_bits(&samples, 1, 0, false), vec![1, 0, 1, 0]);
        assert_eq!(extract_bits(&samples, 1, 1, false), vec![0, 1, 1, 0]);
    }

    #[test]
    fn test_extract_inverted() {
        let samples = [0b0001, 0b0000];
        assert_eq!(extract_bits(&samples, 1, 0, true), vec![0, 1]);
    }

    #[test]
    fn test_extract_multi_bit_mask() {
        // Any bit under the mask counts.
        let samples = [0b1100, 0b0011, 0b0000];
        assert_eq!(extract_bits(&samples, 0b11, 2, false), vec![1, 0, 0]);
    }

    #[test]
    fn test_median_filter_removes_single_glitch() {
        let trace = [0, 0, 1, 0, 0, 1, 1, 1, 0, 1, 1];
        let filtered = median_filter(&trace, 3).unwrap();
        assert_eq!(filtered, vec![0, 0, 0, 0, 0, 1, 1, 1, 1, 1, 1]);
    }

    #[test]
    fn test_median_filter_identity_window() {
        let trace = [1, 0, 1];
        assert_eq!(median_filter(&trace, 1).unwrap(), trace.to_vec());
    }

    #[test]
    fn test_median_filter_rejects_even_window() {
        assert!(median_filter(&[0, 1], 4).is_err());
        assert!(median_filter(&[0, 1], 0).is_err());
    }

    #[test]
    fn test_median_filter_empty_trace() {
        assert_eq!(median_filter(&[], 5).unwrap(), Vec::<u8>::new());
    }
}
