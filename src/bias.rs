//! Estimator corrections: the alpha constant, linear counting, the
//! linear-counting threshold, and the empirical bias lookup.

use crate::constants::{BIAS_DATA, RAW_ESTIMATE_DATA, THRESHOLD_DATA};
use crate::math;

/// Alpha constant for a register count `m`.
#[inline]
pub(crate) fn alpha(m: u64) -> f64 {
    match m {
        16 => 0.673,
        32 => 0.697,
        64 => 0.709,
        _ => 0.7213 / (1.0 + 1.079 / m as f64),
    }
}

/// Linear-counting estimate for `m` registers of which `v` are empty.
#[inline]
pub(crate) fn linear_count(m: u64, v: u64) -> f64 {
    let m = m as f64;
    m * math::ln(m / v as f64)
}

/// Estimate below which linear counting beats the corrected raw estimator.
///
/// Above the tabulated precisions the cutoff is `5 * m`, the same bound that
/// gates bias correction: past it the raw estimator needs no help.
pub(crate) fn threshold(p: u8) -> f64 {
    match p {
        4..=18 => THRESHOLD_DATA[(p - 4) as usize],
        _ => (5u64 << p) as f64,
    }
}

/// Empirical bias of the raw estimate `e` at precision `p`, linearly
/// interpolated between the two tabulated samples bracketing `e`. Returns 0.0
/// when `p` or `e` falls outside the tabulated domain, in which case the raw
/// estimate is used uncorrected.
pub(crate) fn estimate_bias(e: f64, p: u8) -> f64 {
    if !(4..=18).contains(&p) {
        return 0.0;
    }
    let raws = RAW_ESTIMATE_DATA[(p - 4) as usize];
    let biases = BIAS_DATA[(p - 4) as usize];
    if e < raws[0] || e > raws[raws.len() - 1] {
        return 0.0;
    }
    let i = raws.partition_point(|&r| r < e);
    if raws[i] == e {
        return biases[i];
    }
    let t = (e - raws[i - 1]) / (raws[i] - raws[i - 1]);
    biases[i - 1] + t * (biases[i] - biases[i - 1])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alpha_constants() {
        assert_eq!(alpha(16), 0.673);
        assert_eq!(alpha(32), 0.697);
        assert_eq!(alpha(64), 0.709);
        let m = 1u64 << 14;
        assert_eq!(alpha(m), 0.7213 / (1.0 + 1.079 / m as f64));
    }

    #[test]
    fn bias_interpolation_matches_reference_points() {
        let b = estimate_bias(27.5, 5);
        assert!((b / 17.4134 - 1.0).abs() < 0.01, "bias at 27.5/p5 was {b}");
        let b = estimate_bias(11822.412839663843, 14);
        assert!(
            (b / 11811.188669 - 1.0).abs() < 0.01,
            "bias at 11822.41/p14 was {b}"
        );
    }

    #[test]
    fn bias_hits_tabulated_samples_exactly() {
        let raws = RAW_ESTIMATE_DATA[0];
        let biases = BIAS_DATA[0];
        assert_eq!(estimate_bias(raws[0], 4), biases[0]);
        assert_eq!(estimate_bias(raws[raws.len() - 1], 4), biases[biases.len() - 1]);
    }

    #[test]
    fn bias_is_zero_outside_domain() {
        assert_eq!(estimate_bias(1.0, 4), 0.0);
        assert_eq!(estimate_bias(1.0e12, 4), 0.0);
        assert_eq!(estimate_bias(1000.0, 19), 0.0);
        assert_eq!(estimate_bias(1000.0, 3), 0.0);
    }

    #[test]
    fn tables_are_sorted_and_parallel() {
        for p in 4..=18u8 {
            let raws = RAW_ESTIMATE_DATA[(p - 4) as usize];
            let biases = BIAS_DATA[(p - 4) as usize];
            assert_eq!(raws.len(), biases.len());
            for pair in raws.windows(2) {
                assert!(pair[0] < pair[1]);
            }
        }
    }

    #[test]
    fn threshold_lookup() {
        assert_eq!(threshold(4), 10.0);
        assert_eq!(threshold(14), 11500.0);
        assert_eq!(threshold(18), 350_000.0);
        assert_eq!(threshold(20), (5u64 << 20) as f64);
    }
}
