//! Log-combinatorics used by the description length.

use std::f64::consts::PI;

/// `ln n!`, exact below 32 and Stirling's series above.
pub(crate) fn ln_fact(n: u64) -> f64 {
    if n < 32 {
        return (2..=n).map(|k| (k as f64).ln()).sum();
    }
    let x = n as f64;
    x * x.ln() - x + 0.5 * (2.0 * PI * x).ln() + 1.0 / (12.0 * x) - 1.0 / (360.0 * x * x * x)
}

/// `ln C(n, k)`; zero outside `0 <= k <= n`.
pub(crate) fn ln_binom(n: u64, k: u64) -> f64 {
    if k == 0 || k >= n {
        return 0.0;
    }
    ln_fact(n) - ln_fact(k) - ln_fact(n - k)
}

/// `ln ((n, k))`, the number of multisets of size `k` over `n` symbols.
pub(crate) fn ln_multiset(n: u64, k: u64) -> f64 {
    if k == 0 || n == 0 {
        return 0.0;
    }
    ln_binom(n + k - 1, k)
}

pub(crate) fn xlogx(x: u64) -> f64 {
    if x == 0 {
        0.0
    } else {
        let x = x as f64;
        x * x.ln()
    }
}
