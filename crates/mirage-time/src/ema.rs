//! Exponential moving average for noisy timing samples

/// Recency-weighted running average over a window of `n` samples.
///
/// The first sample seeds the average directly. Seeding with zero instead
/// would drag every early estimate toward zero while the connection warms up.
#[derive(Clone, Debug)]
pub struct ExponentialMovingAverage {
    /// Weight of each new sample, `2 / (n + 1)`
    alpha: f64,
    /// Current average
    value: f64,
    /// Recency-weighted variance around the average
    variance: f64,
    /// Samples seen since creation or reset
    samples: u64,
}

impl ExponentialMovingAverage {
    /// Create an average over a window of `n` samples
    pub fn new(n: f64) -> Self {
        ExponentialMovingAverage {
            alpha: (2.0 / (n + 1.0)).clamp(0.0, 1.0),
            value: 0.0,
            variance: 0.0,
            samples: 0,
        }
    }

    /// Add a sample and return the updated average
    pub fn update(&mut self, sample: f64) -> f64 {
        if self.samples == 0 {
            self.value = sample;
        } else {
            let delta = sample - self.value;
            self.value += self.alpha * delta;
            self.variance = (1.0 - self.alpha) * (self.variance + self.alpha * delta * delta);
        }
        self.samples += 1;
        self.value
    }

    #[inline]
    pub fn value(&self) -> f64 {
        self.value
    }

    #[inline]
    pub fn variance(&self) -> f64 {
        self.variance
    }

    #[inline]
    pub fn standard_deviation(&self) -> f64 {
        self.variance.sqrt()
    }

    #[inline]
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.samples > 0
    }

    #[inline]
    pub fn sample_count(&self) -> u64 {
        self.samples
    }

    /// Forget all samples, keeping the window
    pub fn reset(&mut self) {
        self.value = 0.0;
        self.variance = 0.0;
        self.samples = 0;
    }
}
