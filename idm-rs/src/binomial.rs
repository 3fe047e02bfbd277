//! Binomial probability mass function.
//!
//! Evaluated in the saddle-point form of Loader (2000): the Stirling
//! remainders and the deviance terms are each small, so the result keeps
//! close to full precision even when `n` is in the billions.

use std::f64::consts::PI;

const LN_SQRT_2PI: f64 = 0.918_938_533_204_672_7;

/// Natural log of the gamma function for `x > 0`.
///
/// Stirling series, with the argument shifted up to at least 10 by the
/// recurrence `ln Γ(x) = ln Γ(x + 1) - ln x`.
pub fn ln_gamma(x: f64) -> f64 {
    if x <= 0.0 {
        return f64::INFINITY;
    }
    let mut x = x;
    let mut shift = 0.0;
    while x < 10.0 {
        shift -= x.ln();
        x += 1.0;
    }
    let x2 = x * x;
    let series = 1.0 / (12.0 * x) - 1.0 / (360.0 * x2 * x) + 1.0 / (1260.0 * x2 * x2 * x)
        - 1.0 / (1680.0 * x2 * x2 * x2 * x)
        + 1.0 / (1188.0 * x2 * x2 * x2 * x2 * x);
    shift + (x - 0.5) * x.ln() - x + 0.5 * (2.0 * PI).ln() + series
}

/// `ln C(n, k)`; negative infinity when `k > n`.
pub fn ln_choose(n: u64, k: u64) -> f64 {
    if k > n {
        return f64::NEG_INFINITY;
    }
    ln_gamma(n as f64 + 1.0) - ln_gamma(k as f64 + 1.0) - ln_gamma((n - k) as f64 + 1.0)
}

/// `ln(n!) - ((n + 1/2) ln n - n + ln sqrt(2π))` for `n >= 1`.
fn stirlerr(n: f64) -> f64 {
    const S0: f64 = 1.0 / 12.0;
    const S1: f64 = 1.0 / 360.0;
    const S2: f64 = 1.0 / 1260.0;
    const S3: f64 = 1.0 / 1680.0;
    const S4: f64 = 1.0 / 1188.0;

    if n <= 15.0 {
        return ln_gamma(n + 1.0) - (n + 0.5) * n.ln() + n - LN_SQRT_2PI;
    }
    let nn = n * n;
    if n > 500.0 {
        (S0 - S1 / nn) / n
    } else if n > 80.0 {
        (S0 - (S1 - S2 / nn) / nn) / n
    } else if n > 35.0 {
        (S0 - (S1 - (S2 - S3 / nn) / nn) / nn) / n
    } else {
        (S0 - (S1 - (S2 - (S3 - S4 / nn) / nn) / nn) / nn) / n
    }
}

/// Deviance term `x ln(x / np) + np - x`, summed as a series when `x` is
/// close to `np` to avoid cancellation.
fn bd0(x: f64, np: f64) -> f64 {
    if (x - np).abs() < 0.1 * (x + np) {
        let mut v = (x - np) / (x + np);
        let mut s = (x - np) * v;
        let mut ej = 2.0 * x * v;
        v *= v;
        for j in 1..1000 {
            ej *= v;
            let next = s + ej / (2 * j + 1) as f64;
            if next == s {
                return next;
            }
            s = next;
        }
        return s;
    }
    x * (x / np).ln() + np - x
}

/// `P[X = k]` for `X ~ Binomial(n, p)`.
///
/// Returns NaN when `p` is not a probability so that callers can detect it
/// alongside overflow.
pub fn pmf(n: u64, p: f64, k: u64) -> f64 {
    if !(0.0..=1.0).contains(&p) {
        return f64::NAN;
    }
    if k > n {
        return 0.0;
    }
    if n == 0 {
        return 1.0;
    }
    if p == 0.0 {
        return if k == 0 { 1.0 } else { 0.0 };
    }
    if p == 1.0 {
        return if k == n { 1.0 } else { 0.0 };
    }

    let q = 1.0 - p;
    let (nf, kf) = (n as f64, k as f64);
    if k == 0 {
        let ln_p = if p < 0.1 {
            -bd0(nf, nf * q) - nf * p
        } else {
            nf * (-p).ln_1p()
        };
        return ln_p.exp();
    }
    if k == n {
        let ln_p = if q < 0.1 {
            -bd0(nf, nf * p) - nf * q
        } else {
            nf * p.ln()
        };
        return ln_p.exp();
    }

    let rest = nf - kf;
    let lc = stirlerr(nf) - stirlerr(kf) - stirlerr(rest) - bd0(kf, nf * p) - bd0(rest, nf * q);
    let lf = (2.0 * PI).ln() + kf.ln() + (-kf / nf).ln_1p();
    (lc - 0.5 * lf).exp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, distr::Distribution, rngs::StdRng};
    use rand_distr::Binomial;

    fn assert_close(actual: f64, expected: f64, rel: f64) {
        assert!(
            (actual - expected).abs() <= rel * expected.abs().max(1e-300),
            "actual={actual} expected={expected}"
        );
    }

    #[test]
    fn test_ln_gamma_reference_values() {
        assert!(ln_gamma(1.0).abs() < 1e-11);
        assert!(ln_gamma(2.0).abs() < 1e-11);
        assert_close(ln_gamma(0.5), 0.5723649429247004, 1e-11);
        assert_close(ln_gamma(7.5), 7.534364236758734, 1e-12);
        assert_close(ln_gamma(101.0), 363.73937555556347, 1e-13);
        assert_close(ln_gamma(1e6), 12815504.569147611, 1e-13);
    }

    #[test]
    fn test_pmf_reference_values() {
        // (n, p, k, P[X = k]) computed at 40 significant digits.
        let cases = [
            (10, 0.5, 5, 252.0 / 1024.0),
            (20, 0.3, 6, 0.19163898275344258),
            (1000, 0.01, 10, 0.12574021112620738),
            (100_000, 0.3934693402873666, 39347, 0.0025824202326733487),
            (10_000_000, 0.3935, 3_934_693, 2.5319360548908112e-4),
            (100_000_000, 0.5, 50_000_000, 7.9788455880815396e-5),
            (1_000_000_000, 0.1, 100_000_000, 4.2052208664903121e-5),
            (1_000_000_000, 0.1, 100_020_000, 4.5573097516085754e-6),
        ];
        for (n, p, k, expected) in cases {
            assert_close(pmf(n, p, k), expected, 1e-11);
        }
    }

    #[test]
    fn test_pmf_small_and_boundary_counts() {
        let cases = [
            (5, 0.3, 0, 0.16807),
            (5, 0.3, 1, 0.36015),
            (5, 0.3, 5, 0.00243),
            (16, 0.4, 7, 0.18888923912601601),
            (3000, 0.999, 3000, 0.049712393998036162),
            (1_000_000_000, 1e-9, 0, 0.36787944098750258),
            (1_000_000_000, 1e-9, 3, 0.061313240164583774),
        ];
        for (n, p, k, expected) in cases {
            assert_close(pmf(n, p, k), expected, 1e-11);
        }
    }

    #[test]
    fn test_ln_choose() {
        assert_close(ln_choose(10, 5), 252f64.ln(), 1e-12);
        assert!(ln_choose(4, 0).abs() < 1e-11);
        assert_eq!(ln_choose(3, 4), f64::NEG_INFINITY);
    }

    #[test]
    fn test_pmf_edges() {
        assert_eq!(pmf(0, 0.4, 0), 1.0);
        assert_eq!(pmf(0, 0.05, 0), 1.0);
        assert_eq!(pmf(5, 0.0, 0), 1.0);
        assert_eq!(pmf(5, 0.0, 1), 0.0);
        assert_eq!(pmf(5, 1.0, 5), 1.0);
        assert_eq!(pmf(5, 1.0, 4), 0.0);
        assert_eq!(pmf(5, 0.5, 6), 0.0);
        assert!(pmf(5, -0.1, 2).is_nan());
        assert!(pmf(5, 1.5, 2).is_nan());
        assert!(pmf(5, f64::NAN, 2).is_nan());
    }

    #[test]
    fn test_pmf_sums_to_one() {
        for (n, p) in [(1, 0.5), (17, 0.05), (250, 0.6), (3000, 0.999)] {
            let total: f64 = (0..=n).map(|k| pmf(n, p, k)).sum();
            assert!((total - 1.0).abs() < 1e-9, "n={n} p={p} total={total}");
        }
    }

    #[test]
    fn test_pmf_matches_sampling() {
        let (n, p) = (50, 0.3);
        let samples = 200_000;
        let binomial = Binomial::new(n, p).unwrap();
        let mut rng = StdRng::seed_from_u64(8675309);
        let mut counts = vec![0u64; n as usize + 1];
        for _ in 0..samples {
            counts[binomial.sample(&mut rng) as usize] += 1;
        }
        for (k, count) in counts.iter().enumerate() {
            let frequency = *count as f64 / samples as f64;
            assert!((frequency - pmf(n, p, k as u64)).abs() < 5e-3);
        }
    }
}
