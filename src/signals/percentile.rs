//! Percentile ranks
//!
//! `pctl(x) = |{v ≤ x}| / n` over the files that carry the signal. Values
//! below the signal's floor rank 0. Non-finite values are withheld.

use tracing::warn;

use super::registry::Signal;

/// Percentile rank of every value, in input order.
///
/// `None` entries (signal not available for that file) and non-finite values
/// get `None` and do not count towards `n`.
pub fn percentile_ranks(signal: Signal, values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut sorted: Vec<f64> = Vec::with_capacity(values.len());
    let mut withheld = 0usize;
    for v in values.iter().flatten() {
        if v.is_finite() {
            sorted.push(*v);
        } else {
            withheld += 1;
        }
    }
    if withheld > 0 {
        warn!(
            "Withholding {} non-finite value(s) of signal {}",
            withheld, signal
        );
    }
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len();
    let floor = signal.percentile_floor();

    values
        .iter()
        .map(|v| {
            let x = (*v)?;
            if !x.is_finite() || n == 0 {
                return None;
            }
            if floor.is_some_and(|f| x < f) {
                return Some(0.0);
            }
            let at_or_below = sorted.partition_point(|&s| s <= x);
            Some(at_or_below as f64 / n as f64)
        })
        .collect()
}

/// Percentile of a single value against a population.
pub fn percentile_of(x: f64, population: &[f64]) -> f64 {
    if population.is_empty() {
        return 0.0;
    }
    let at_or_below = population.iter().filter(|&&v| v <= x).count();
    at_or_below as f64 / population.len() as f64
}
