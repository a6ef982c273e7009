//! Running statistics over a scalar signal.
//!
//! Strategy: update count, mean and the second to fourth central moments in a
//! single pass (Welford / Terriberry) so no history is retained.

use serde::{Deserialize, Serialize};

/// `m2 * m2` must exceed this before kurtosis is recomputed.
const KURTOSIS_GUARD: f64 = 3.0;

/// Single-pass mean, variance and kurtosis accumulator.
///
/// Only `update` mutates a sample. Readers are pure.
///
/// # Examples
///
/// ```
/// use sigmon::Sample;
///
/// let mut s = Sample::new();
/// for x in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
///     s.update(x);
/// }
/// assert_eq!(s.size(), 8);
/// assert!((s.mean() - 5.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    size: u64,
    mean: f64,
    variance: f64,
    #[serde(skip)]
    kurtosis: f64,
    #[serde(skip)]
    m2: f64,
    #[serde(skip)]
    m3: f64,
    #[serde(skip)]
    m4: f64,
}

impl Sample {
    /// Creates an empty sample.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            size: 0,
            mean: 0.0,
            variance: 0.0,
            kurtosis: 0.0,
            m2: 0.0,
            m3: 0.0,
            m4: 0.0,
        }
    }

    /// Adds a value to the sample.
    #[allow(clippy::cast_precision_loss)]
    pub fn update(&mut self, x: f64) {
        let n1 = self.size as f64;
        self.size += 1;
        let n = self.size as f64;

        let delta = x - self.mean;
        let delta_n = delta / n;
        let delta_n2 = delta_n * delta_n;
        let term1 = delta * delta_n * n1;

        self.mean += delta_n;

        // Order matters: m4 uses the old m3 and m2, m3 uses the old m2.
        self.m4 += term1 * delta_n2 * (n * n - 3.0 * n + 3.0) + 6.0 * delta_n2 * self.m2 - 4.0 * delta_n * self.m3;
        self.m3 += term1 * delta_n * (n - 2.0) - 3.0 * delta_n * self.m2;
        self.m2 += term1;

        if self.m2 * self.m2 > KURTOSIS_GUARD {
            self.kurtosis = (n * self.m4) / (self.m2 * self.m2) - 3.0;
        }

        if self.size > 1 {
            self.variance = self.m2 / (n - 1.0);
        }
    }

    /// Number of values seen.
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    #[must_use]
    pub const fn mean(&self) -> f64 {
        self.mean
    }

    /// Unbiased sample variance; zero until two values were seen.
    #[must_use]
    pub const fn variance(&self) -> f64 {
        self.variance
    }

    /// Excess kurtosis. Keeps its last value while the spread is degenerate.
    #[must_use]
    pub const fn kurtosis(&self) -> f64 {
        self.kurtosis
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.size == 0
    }
}
