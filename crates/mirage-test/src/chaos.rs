//! Chaos network for snapshot replication
//!
//! Carries encoded snapshot frames from server to client under:
//! - Jitter
//! - Random and burst loss
//! - Reordering
//! - Duplication

use std::time::Duration;

use bytes::Bytes;
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

/// Jitter distribution, added on top of the base latency.
///
/// Samples may be negative; the resulting latency is floored at zero.
#[derive(Clone, Debug, PartialEq)]
pub enum JitterDistribution {
    /// No jitter
    None,
    /// Uniform in `[min_ms, max_ms)`
    Uniform { min_ms: f64, max_ms: f64 },
    /// Normal distribution (mean, stddev)
    Normal { mean_ms: f64, stddev_ms: f64 },
    /// Pareto distribution (heavy tail), capped at one second
    Pareto { scale_ms: f64, shape: f64 },
}

impl JitterDistribution {
    /// Sample a jitter value in milliseconds
    pub fn sample_ms(&self, rng: &mut StdRng) -> f64 {
        match self {
            JitterDistribution::None => 0.0,
            JitterDistribution::Uniform { min_ms, max_ms } => {
                if max_ms <= min_ms {
                    return *min_ms;
                }
                Uniform::new(*min_ms, *max_ms).sample(rng)
            }
            JitterDistribution::Normal { mean_ms, stddev_ms } => {
                // Box-Muller
                let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
                let u2: f64 = rng.gen();
                let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
                mean_ms + stddev_ms * z
            }
            JitterDistribution::Pareto { scale_ms, shape } => {
                let u: f64 = rng.gen_range(f64::EPSILON..1.0);
                (scale_ms / u.powf(1.0 / shape)).min(1000.0)
            }
        }
    }
}

/// Network chaos configuration
#[derive(Clone, Debug, PartialEq)]
pub struct ChaosConfig {
    /// Base one-way latency
    pub base_latency: Duration,
    /// Jitter distribution
    pub jitter: JitterDistribution,
    /// Packet loss rate (0.0 - 1.0)
    pub loss_rate: f64,
    /// Burst loss probability
    pub burst_loss_prob: f64,
    /// Burst loss length range
    pub burst_length: (u32, u32),
    /// Probability that a packet overtakes packets already in flight
    pub reorder_prob: f64,
    /// Maximum overtake distance (packets)
    pub reorder_depth: u32,
    /// Duplicate probability
    pub duplicate_prob: f64,
}

impl Default for ChaosConfig {
    fn default() -> Self {
        ChaosConfig {
            base_latency: Duration::from_millis(50),
            jitter: JitterDistribution::Uniform {
                min_ms: 0.0,
                max_ms: 20.0,
            },
            loss_rate: 0.01,
            burst_loss_prob: 0.01,
            burst_length: (2, 5),
            reorder_prob: 0.05,
            reorder_depth: 3,
            duplicate_prob: 0.01,
        }
    }
}

impl ChaosConfig {
    /// Fixed latency, nothing lost, nothing reordered
    pub fn ideal(latency: Duration) -> Self {
        ChaosConfig {
            base_latency: latency,
            jitter: JitterDistribution::None,
            loss_rate: 0.0,
            burst_loss_prob: 0.0,
            burst_length: (0, 0),
            reorder_prob: 0.0,
            reorder_depth: 0,
            duplicate_prob: 0.0,
        }
    }

    /// Good network conditions
    pub fn good() -> Self {
        ChaosConfig {
            base_latency: Duration::from_millis(20),
            jitter: JitterDistribution::Uniform {
                min_ms: 0.0,
                max_ms: 5.0,
            },
            loss_rate: 0.001,
            burst_loss_prob: 0.001,
            burst_length: (1, 2),
            reorder_prob: 0.01,
            reorder_depth: 2,
            duplicate_prob: 0.001,
        }
    }

    /// Poor network conditions
    pub fn poor() -> Self {
        ChaosConfig {
            base_latency: Duration::from_millis(100),
            jitter: JitterDistribution::Pareto {
                scale_ms: 10.0,
                shape: 2.0,
            },
            loss_rate: 0.05,
            burst_loss_prob: 0.02,
            burst_length: (3, 8),
            reorder_prob: 0.1,
            reorder_depth: 5,
            duplicate_prob: 0.02,
        }
    }

    /// Hostile network conditions
    pub fn hostile() -> Self {
        ChaosConfig {
            base_latency: Duration::from_millis(200),
            jitter: JitterDistribution::Pareto {
                scale_ms: 30.0,
                shape: 1.2,
            },
            loss_rate: 0.15,
            burst_loss_prob: 0.05,
            burst_length: (5, 15),
            reorder_prob: 0.2,
            reorder_depth: 10,
            duplicate_prob: 0.05,
        }
    }

    /// Lossless link whose latency swings by ±50% of `send_interval`
    pub fn jittered(send_interval: Duration) -> Self {
        let half_ms = send_interval.as_secs_f64() * 1000.0 / 2.0;
        ChaosConfig {
            base_latency: Duration::from_millis(50),
            jitter: JitterDistribution::Uniform {
                min_ms: -half_ms,
                max_ms: half_ms,
            },
            ..Self::ideal(Duration::from_millis(50))
        }
    }
}

/// Packet in the chaos network
#[derive(Clone, Debug)]
pub struct ChaosPacket {
    /// Encoded frame
    pub data: Bytes,
    /// Scheduled delivery time (relative to start)
    pub delivery_time: Duration,
    /// Original send time
    pub send_time: Duration,
    /// Sequence number (for tracking)
    pub seq: u64,
}

/// Chaos network statistics
#[derive(Clone, Debug, Default)]
pub struct ChaosStats {
    pub packets_sent: u64,
    pub packets_delivered: u64,
    pub packets_lost: u64,
    pub packets_reordered: u64,
    pub packets_duplicated: u64,
    pub total_latency_ms: f64,
    pub max_latency_ms: f64,
}

impl ChaosStats {
    pub fn loss_rate(&self) -> f64 {
        if self.packets_sent == 0 {
            0.0
        } else {
            self.packets_lost as f64 / self.packets_sent as f64
        }
    }

    pub fn avg_latency_ms(&self) -> f64 {
        if self.packets_delivered == 0 {
            0.0
        } else {
            self.total_latency_ms / self.packets_delivered as f64
        }
    }
}

/// One-way unreliable link
pub struct ChaosNetwork {
    config: ChaosConfig,
    rng: StdRng,
    /// Packets in flight, kept in delivery order
    in_flight: Vec<ChaosPacket>,
    /// Current time
    current_time: Duration,
    /// Burst loss counter
    burst_remaining: u32,
    /// Sequence counter
    next_seq: u64,
    stats: ChaosStats,
}

impl ChaosNetwork {
    /// Create a chaos network with a fixed seed
    pub fn new(config: ChaosConfig, seed: u64) -> Self {
        ChaosNetwork {
            config,
            rng: StdRng::seed_from_u64(seed),
            in_flight: Vec::new(),
            current_time: Duration::ZERO,
            burst_remaining: 0,
            next_seq: 0,
            stats: ChaosStats::default(),
        }
    }

    /// Swap link conditions; packets already in flight keep their schedule
    pub fn set_config(&mut self, config: ChaosConfig) {
        self.config = config;
        self.burst_remaining = 0;
    }

    pub fn config(&self) -> &ChaosConfig {
        &self.config
    }

    /// Send a frame into the network at the current time
    pub fn send(&mut self, data: Bytes) {
        self.stats.packets_sent += 1;
        let seq = self.next_seq;
        self.next_seq += 1;

        if self.should_drop() {
            self.stats.packets_lost += 1;
            trace!(seq, "chaos: dropped");
            return;
        }

        let mut delivery_time = self.current_time + self.sample_latency();

        // Overtake up to `reorder_depth` packets still in flight
        if self.config.reorder_depth > 0
            && !self.in_flight.is_empty()
            && self.rng.gen::<f64>() < self.config.reorder_prob
        {
            let depth = (self.config.reorder_depth as usize).min(self.in_flight.len());
            let skip = self.rng.gen_range(1..=depth);
            let overtaken = &self.in_flight[self.in_flight.len() - skip];
            delivery_time = delivery_time.min(overtaken.delivery_time);
            self.stats.packets_reordered += 1;
        }

        if self.rng.gen::<f64>() < self.config.duplicate_prob {
            let duplicate_at = self.current_time + self.sample_latency();
            self.schedule(ChaosPacket {
                data: data.clone(),
                delivery_time: duplicate_at,
                send_time: self.current_time,
                seq,
            });
            self.stats.packets_duplicated += 1;
        }

        self.schedule(ChaosPacket {
            data,
            delivery_time,
            send_time: self.current_time,
            seq,
        });
    }

    fn sample_latency(&mut self) -> Duration {
        let jitter_ms = self.config.jitter.sample_ms(&mut self.rng);
        let jitter = Duration::from_secs_f64(jitter_ms.abs() / 1000.0);
        if jitter_ms >= 0.0 {
            self.config.base_latency + jitter
        } else {
            self.config.base_latency.saturating_sub(jitter)
        }
    }

    /// Insert keeping delivery order; ties keep send order
    fn schedule(&mut self, packet: ChaosPacket) {
        let at = self
            .in_flight
            .partition_point(|p| p.delivery_time <= packet.delivery_time);
        self.in_flight.insert(at, packet);
    }

    fn should_drop(&mut self) -> bool {
        if self.burst_remaining > 0 {
            self.burst_remaining -= 1;
            return true;
        }

        if self.rng.gen::<f64>() < self.config.burst_loss_prob {
            let (min, max) = self.config.burst_length;
            // The current packet is the first of the burst
            self.burst_remaining = self.rng.gen_range(min..=max.max(min)).saturating_sub(1);
            return true;
        }

        self.rng.gen::<f64>() < self.config.loss_rate
    }

    /// Advance time and collect everything due by then
    pub fn tick(&mut self, dt: Duration) -> Vec<Bytes> {
        self.current_time += dt;

        let due = self
            .in_flight
            .partition_point(|p| p.delivery_time <= self.current_time);

        self.in_flight
            .drain(..due)
            .map(|packet| {
                let latency_ms = (packet.delivery_time - packet.send_time).as_secs_f64() * 1000.0;
                self.stats.packets_delivered += 1;
                self.stats.total_latency_ms += latency_ms;
                self.stats.max_latency_ms = self.stats.max_latency_ms.max(latency_ms);
                packet.data
            })
            .collect()
    }

    /// Packets scheduled but not yet delivered
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn stats(&self) -> &ChaosStats {
        &self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = ChaosStats::default();
    }

    pub fn current_time(&self) -> Duration {
        self.current_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(i: u8) -> Bytes {
        Bytes::from(vec![i])
    }

    #[test]
    fn test_ideal_link_preserves_order_and_latency() {
        let mut network = ChaosNetwork::new(ChaosConfig::ideal(Duration::from_millis(30)), 1);
        let mut delivered = Vec::new();
        for i in 0..10 {
            network.send(frame(i));
            delivered.extend(network.tick(Duration::from_millis(10)));
        }
        for _ in 0..10 {
            delivered.extend(network.tick(Duration::from_millis(10)));
        }

        let order: Vec<u8> = delivered.iter().map(|b| b[0]).collect();
        assert_eq!(order, (0..10).collect::<Vec<u8>>());
        assert!((network.stats().avg_latency_ms() - 30.0).abs() < 1e-3);
        assert_eq!(network.stats().loss_rate(), 0.0);
    }

    #[test]
    fn test_nothing_arrives_early() {
        let mut network = ChaosNetwork::new(ChaosConfig::ideal(Duration::from_millis(50)), 2);
        network.send(frame(0));

        assert!(network.tick(Duration::from_millis(49)).is_empty());
        assert_eq!(network.tick(Duration::from_millis(1)).len(), 1);
        assert_eq!(network.in_flight(), 0);
    }

    #[test]
    fn test_good_network_delivers_most() {
        let mut network = ChaosNetwork::new(ChaosConfig::good(), 12345);
        for i in 0..100 {
            network.send(frame(i));
        }

        let mut delivered = 0;
        for _ in 0..100 {
            delivered += network.tick(Duration::from_millis(10)).len();
        }
        assert!(delivered > 90);
    }

    #[test]
    fn test_hostile_network_loses_packets() {
        let mut network = ChaosNetwork::new(ChaosConfig::hostile(), 12345);
        for i in 0..1000 {
            network.send(frame(i as u8));
        }
        for _ in 0..500 {
            network.tick(Duration::from_millis(10));
        }

        let stats = network.stats();
        assert!(stats.loss_rate() > 0.05);
        assert!(stats.packets_reordered > 0);
    }

    #[test]
    fn test_jittered_spread() {
        let interval = Duration::from_secs_f64(1.0 / 30.0);
        let mut network = ChaosNetwork::new(ChaosConfig::jittered(interval), 7);

        for i in 0..500 {
            network.send(frame(i as u8));
            network.tick(interval);
        }
        for _ in 0..10 {
            network.tick(interval);
        }

        let stats = network.stats();
        assert_eq!(stats.packets_delivered, 500);
        assert!((stats.avg_latency_ms() - 50.0).abs() < 3.0);
        assert!(stats.max_latency_ms <= 50.0 + 16.7);
        assert!(stats.max_latency_ms > 60.0);
    }

    #[test]
    fn test_pareto_has_heavy_tail() {
        let mut rng = StdRng::seed_from_u64(42);
        let pareto = JitterDistribution::Pareto {
            scale_ms: 50.0,
            shape: 1.5,
        };

        let samples: Vec<f64> = (0..1000).map(|_| pareto.sample_ms(&mut rng)).collect();
        let avg = samples.iter().sum::<f64>() / samples.len() as f64;
        let max = samples.iter().cloned().fold(0.0, f64::max);

        assert!(samples.iter().all(|&s| s >= 50.0));
        assert!(max > avg * 2.0);
    }

    #[test]
    fn test_duplicates_are_delivered_twice() {
        let config = ChaosConfig {
            duplicate_prob: 1.0,
            ..ChaosConfig::ideal(Duration::from_millis(10))
        };
        let mut network = ChaosNetwork::new(config, 3);
        network.send(frame(9));

        let delivered = network.tick(Duration::from_millis(20));
        assert_eq!(delivered.len(), 2);
        assert_eq!(network.stats().packets_duplicated, 1);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Every frame that is not lost comes out exactly once (plus
            /// duplicates), never before the base latency has elapsed.
            #[test]
            fn link_conserves_frames(
                seed in any::<u64>(),
                loss_rate in 0.0f64..0.5,
                reorder_prob in 0.0f64..0.5,
                duplicate_prob in 0.0f64..0.3,
                count in 1usize..200,
            ) {
                let config = ChaosConfig {
                    base_latency: Duration::from_millis(40),
                    jitter: JitterDistribution::Uniform { min_ms: 0.0, max_ms: 30.0 },
                    loss_rate,
                    burst_loss_prob: 0.0,
                    burst_length: (0, 0),
                    reorder_prob,
                    reorder_depth: 4,
                    duplicate_prob,
                };
                let mut network = ChaosNetwork::new(config, seed);
                let step = Duration::from_millis(10);

                let mut delivered = 0u64;
                for i in 0..count {
                    network.send(Bytes::from(vec![i as u8]));
                    let arrivals = network.tick(step);
                    if i < 3 {
                        // Nothing can arrive before 40 ms
                        prop_assert!(arrivals.is_empty());
                    }
                    delivered += arrivals.len() as u64;
                }
                for _ in 0..20 {
                    delivered += network.tick(step).len() as u64;
                }

                let stats = network.stats();
                prop_assert_eq!(network.in_flight(), 0);
                prop_assert_eq!(delivered, stats.packets_delivered);
                prop_assert_eq!(
                    stats.packets_delivered,
                    stats.packets_sent - stats.packets_lost + stats.packets_duplicated
                );
            }
        }
    }
}
