//! Delivery model - passive estimation of snapshot arrival spacing

use mirage_core::ReceiveTime;

use crate::ExponentialMovingAverage;

/// Smoothed statistics over the gaps between accepted arrivals
#[derive(Clone, Debug)]
pub struct DeliveryModel {
    /// Inter-arrival interval EMA (seconds)
    interval_ema: ExponentialMovingAverage,
    /// Arrival time of the previous accepted snapshot
    last_received: Option<ReceiveTime>,
}

impl DeliveryModel {
    /// Create a model averaging over `window` arrivals
    pub fn new(window: f64) -> Self {
        DeliveryModel {
            interval_ema: ExponentialMovingAverage::new(window),
            last_received: None,
        }
    }

    /// Record an accepted arrival. The very first one only sets the
    /// reference point; every later one contributes an interval sample.
    pub fn record_arrival(&mut self, received: ReceiveTime) {
        if let Some(previous) = self.last_received {
            let interval = (received - previous).as_secs_f64();
            self.interval_ema.update(interval);
        }
        self.last_received = Some(received);
    }

    /// Smoothed interval between arrivals, once at least two were seen
    pub fn mean_interval(&self) -> Option<f64> {
        self.interval_ema
            .is_initialized()
            .then(|| self.interval_ema.value())
    }

    /// Standard deviation of the arrival interval (seconds)
    pub fn jitter(&self) -> f64 {
        self.interval_ema.standard_deviation()
    }

    /// Number of interval samples seen
    pub fn samples(&self) -> u64 {
        self.interval_ema.sample_count()
    }

    pub fn last_received(&self) -> Option<ReceiveTime> {
        self.last_received
    }

    pub fn reset(&mut self) {
        self.interval_ema.reset();
        self.last_received = None;
    }
}
