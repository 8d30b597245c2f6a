//! Per-file churn series and trajectory classification
//!
//! Commits are bucketed into fixed-width windows starting at the oldest
//! commit. Per file:
//!
//! ```text
//!   slope b  = OLS slope of touches over window index
//!   CV       = σ / μ  (population σ)
//!
//!   DORMANT      total ≤ 1
//!   STABILIZING  b < 0 and CV < 1
//!   SPIKING      b > 0 and CV > 0.5
//!   CHURNING     CV > 0.5
//!   STABLE       otherwise
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Trajectory {
    #[default]
    Dormant,
    Stabilizing,
    Stable,
    Churning,
    Spiking,
}

impl Trajectory {
    /// Churning or spiking: erratic change activity.
    pub fn is_volatile(self) -> bool {
        matches!(self, Trajectory::Churning | Trajectory::Spiking)
    }
}

impl std::fmt::Display for Trajectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Trajectory::Dormant => "DORMANT",
            Trajectory::Stabilizing => "STABILIZING",
            Trajectory::Stable => "STABLE",
            Trajectory::Churning => "CHURNING",
            Trajectory::Spiking => "SPIKING",
        };
        write!(f, "{}", name)
    }
}

/// Touch counts per window and the statistics derived from them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChurnSeries {
    pub window_counts: Vec<u32>,
    pub total_changes: usize,
    pub slope: f64,
    pub cv: f64,
    pub trajectory: Trajectory,
    /// Shannon entropy (bits) of the distribution of touches over windows
    pub change_entropy: f64,
}

impl ChurnSeries {
    pub fn from_counts(window_counts: Vec<u32>) -> Self {
        let values: Vec<f64> = window_counts.iter().map(|&c| f64::from(c)).collect();
        let total_changes = window_counts.iter().map(|&c| c as usize).sum();
        let slope = linear_slope(&values);
        let cv = coefficient_of_variation(&values);
        Self {
            trajectory: classify_trajectory(total_changes, slope, cv),
            change_entropy: change_entropy(&window_counts),
            window_counts,
            total_changes,
            slope,
            cv,
        }
    }
}

/// Width of one churn window in seconds.
pub fn window_seconds(window_weeks: u32) -> i64 {
    i64::from(window_weeks) * 7 * 86_400
}

/// Window index of a timestamp, clamped to the last window.
pub fn window_index(timestamp: i64, origin: i64, window_secs: i64, num_windows: usize) -> usize {
    if window_secs <= 0 || num_windows == 0 {
        return 0;
    }
    let idx = ((timestamp - origin).max(0) / window_secs) as usize;
    idx.min(num_windows - 1)
}

/// Ordinary least squares slope of `values` against their index.
pub fn linear_slope(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = values.iter().sum::<f64>() / n as f64;
    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for (i, v) in values.iter().enumerate() {
        let dx = i as f64 - x_mean;
        numerator += dx * (v - y_mean);
        denominator += dx * dx;
    }
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Coefficient of variation σ/μ with population σ; 0 for < 2 values or μ = 0.
pub fn coefficient_of_variation(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    if mean == 0.0 {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
    variance.sqrt() / mean
}

pub fn classify_trajectory(total_changes: usize, slope: f64, cv: f64) -> Trajectory {
    if total_changes <= 1 {
        Trajectory::Dormant
    } else if slope < 0.0 && cv < 1.0 {
        Trajectory::Stabilizing
    } else if slope > 0.0 && cv > 0.5 {
        Trajectory::Spiking
    } else if cv > 0.5 {
        Trajectory::Churning
    } else {
        Trajectory::Stable
    }
}

/// Shannon entropy in bits of a count distribution.
pub fn change_entropy(counts: &[u32]) -> f64 {
    let total: f64 = counts.iter().map(|&c| f64::from(c)).sum();
    if total <= 0.0 {
        return 0.0;
    }
    counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = f64::from(c) / total;
            -p * p.log2()
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn test_linear_slope() {
        assert!((linear_slope(&[1.0, 2.0, 3.0, 4.0]) - 1.0).abs() < EPSILON);
        assert!((linear_slope(&[4.0, 2.0, 0.0]) + 2.0).abs() < EPSILON);
        assert_eq!(linear_slope(&[5.0]), 0.0);
    }

    #[test]
    fn test_cv() {
        assert_eq!(coefficient_of_variation(&[2.0, 2.0, 2.0]), 0.0);
        // mean 1, population σ 1
        assert!((coefficient_of_variation(&[0.0, 2.0]) - 1.0).abs() < EPSILON);
        assert_eq!(coefficient_of_variation(&[0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_trajectories() {
        assert_eq!(ChurnSeries::from_counts(vec![1, 0, 0]).trajectory, Trajectory::Dormant);
        assert_eq!(
            ChurnSeries::from_counts(vec![3, 3, 3, 3]).trajectory,
            Trajectory::Stable
        );
        assert_eq!(
            ChurnSeries::from_counts(vec![4, 3, 2, 2]).trajectory,
            Trajectory::Stabilizing
        );
        assert_eq!(
            ChurnSeries::from_counts(vec![0, 0, 1, 8]).trajectory,
            Trajectory::Spiking
        );
        // flat trend, erratic
        assert_eq!(
            ChurnSeries::from_counts(vec![5, 0, 0, 5]).trajectory,
            Trajectory::Churning
        );
    }

    #[test]
    fn test_window_index_clamps() {
        let w = window_seconds(4);
        assert_eq!(window_index(0, 0, w, 3), 0);
        assert_eq!(window_index(w, 0, w, 3), 1);
        assert_eq!(window_index(10 * w, 0, w, 3), 2);
    }

    #[test]
    fn test_change_entropy() {
        assert_eq!(change_entropy(&[5, 0, 0]), 0.0);
        assert!((change_entropy(&[1, 1]) - 1.0).abs() < EPSILON);
    }
}
