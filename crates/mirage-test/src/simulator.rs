//! Replication simulator - server, chaos link and client replica end to end
//!
//! Simulates:
//! - A ping-pong server ticking at its own rate
//! - Snapshot frames crossing an unreliable link
//! - A client rendering at an unrelated frame rate
//!
//! Rendered positions are compared against the ground-truth motion at the
//! client's local timeline.

use std::time::Duration;

use mirage_core::{MirageResult, Position, ReceiveTime, ReplicaConfig, ServerTime, SnapshotMessage};
use mirage_source::{MotionSource, PingPong, ServerRuntime};
use mirage_time::{ClientReplica, PlaybackMode, ReplicaStats, StepOutcome};
use tracing::{info, warn};

use crate::chaos::{ChaosConfig, ChaosNetwork, ChaosStats};

/// Simulation parameters
#[derive(Clone, Debug)]
pub struct SimulationConfig {
    /// Server and client replication settings
    pub replica: ReplicaConfig,
    /// Link conditions
    pub chaos: ChaosConfig,
    /// Server simulation rate (Hz)
    pub server_tick_rate: u32,
    /// Client render rate (Hz)
    pub client_frame_rate: u32,
    /// Frames before this point are excluded from drift and error statistics
    pub warmup: Duration,
    /// Chaos RNG seed
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            replica: ReplicaConfig::default(),
            chaos: ChaosConfig::good(),
            server_tick_rate: 60,
            client_frame_rate: 60,
            warmup: Duration::from_secs(1),
            seed: 0x5eed,
        }
    }
}

/// Simulation result and statistics
#[derive(Clone, Debug, Default)]
pub struct SimulationReport {
    /// Simulated time covered by this run
    pub duration: Duration,
    /// Client frames rendered
    pub frames: u64,
    /// Frames that produced no sample (nothing received yet)
    pub empty_frames: u64,
    pub holding_frames: u64,
    pub starved_frames: u64,
    /// Frames spent in each playback mode
    pub nominal_frames: u64,
    pub catching_up_frames: u64,
    pub slowing_down_frames: u64,
    pub snapshots_sent: u64,
    pub frames_received: u64,
    pub decode_errors: u64,
    /// Largest absolute smoothed drift after warm-up (seconds)
    pub max_abs_drift: f64,
    /// Distance between rendered and true position after warm-up
    pub mean_render_error: f64,
    pub max_render_error: f64,
    /// Largest distance the rendered position moved in a single frame
    pub max_frame_step: f32,
    /// Interpolation factor bounds observed
    pub min_t: f64,
    pub max_t: f64,
    /// Largest buffer occupancy seen
    pub max_buffered: usize,
    /// Replica counters at the end of the run
    pub replica: ReplicaStats,
    /// Link counters at the end of the run
    pub chaos: ChaosStats,
    render_error_sum: f64,
    render_error_samples: u64,
}

impl SimulationReport {
    fn new() -> Self {
        SimulationReport {
            min_t: 1.0,
            max_t: 0.0,
            ..Default::default()
        }
    }

    fn record_render_error(&mut self, error: f64) {
        self.render_error_sum += error;
        self.render_error_samples += 1;
        self.max_render_error = self.max_render_error.max(error);
    }

    fn finalize(&mut self) {
        if self.render_error_samples > 0 {
            self.mean_render_error = self.render_error_sum / self.render_error_samples as f64;
        }
    }

    /// Fraction of rendered frames spent starved
    pub fn starvation_rate(&self) -> f64 {
        if self.frames == 0 {
            0.0
        } else {
            self.starved_frames as f64 / self.frames as f64
        }
    }
}

/// End-to-end replication scenario for one ping-pong entity
pub struct ReplicationSimulator {
    config: SimulationConfig,
    motion: PingPong,
    server: ServerRuntime<PingPong>,
    network: ChaosNetwork,
    replica: ClientReplica<Position>,
    /// Global simulation time
    time: Duration,
    server_interval: Duration,
    frame_interval: Duration,
    next_server_tick: Duration,
    next_frame: Duration,
    /// Totals carried across runs
    snapshots_sent: u64,
    frames_received: u64,
    decode_errors: u64,
}

impl ReplicationSimulator {
    pub fn new(config: SimulationConfig) -> MirageResult<Self> {
        let motion = PingPong::from_settings(Position::ZERO, config.replica.server());
        let server = ServerRuntime::new(motion, config.replica.server())?;

        Ok(ReplicationSimulator {
            motion,
            server,
            network: ChaosNetwork::new(config.chaos.clone(), config.seed),
            replica: ClientReplica::new(config.replica.clone()),
            time: Duration::ZERO,
            server_interval: rate_to_interval(config.server_tick_rate),
            frame_interval: rate_to_interval(config.client_frame_rate),
            next_server_tick: Duration::ZERO,
            next_frame: Duration::ZERO,
            snapshots_sent: 0,
            frames_received: 0,
            decode_errors: 0,
            config,
        })
    }

    /// Change link conditions mid-run
    pub fn set_chaos(&mut self, chaos: ChaosConfig) {
        info!(latency = ?chaos.base_latency, "switching link conditions");
        self.network.set_config(chaos.clone());
        self.config.chaos = chaos;
    }

    /// Run the simulation for `duration` of simulated time
    pub fn run(&mut self, duration: Duration) -> SimulationReport {
        let mut report = SimulationReport::new();
        let end = self.time + duration;
        let mut last_rendered: Option<Position> = None;

        loop {
            let next = self.next_server_tick.min(self.next_frame);
            if next > end {
                break;
            }

            self.deliver_until(next);

            if self.next_server_tick == next {
                self.server_tick();
                self.next_server_tick += self.server_interval;
            }

            if self.next_frame == next {
                self.client_frame(&mut report, &mut last_rendered);
                self.next_frame += self.frame_interval;
            }
        }

        self.deliver_until(end);

        report.duration = duration;
        report.snapshots_sent = self.snapshots_sent;
        report.frames_received = self.frames_received;
        report.decode_errors = self.decode_errors;
        report.replica = self.replica.stats().clone();
        report.chaos = self.network.stats().clone();
        report.finalize();

        info!(
            frames = report.frames,
            starved = report.starved_frames,
            max_abs_drift_ms = report.max_abs_drift * 1000.0,
            mean_render_error = report.mean_render_error,
            loss_rate = report.chaos.loss_rate(),
            "simulation finished"
        );

        report
    }

    /// Advance the link to `until` and hand every arrival to the replica
    fn deliver_until(&mut self, until: Duration) {
        if until <= self.time {
            return;
        }
        let arrivals = self.network.tick(until - self.time);
        self.time = until;

        let received = ReceiveTime::from_micros(self.time.as_micros() as u64);
        for frame in arrivals {
            self.frames_received += 1;
            match SnapshotMessage::decode(&frame) {
                Ok(message) => {
                    self.replica.receive_message(message, received);
                }
                Err(err) => {
                    self.decode_errors += 1;
                    warn!(%err, "dropping undecodable frame");
                }
            }
        }
    }

    fn server_tick(&mut self) {
        let now = ServerTime::from_micros(self.time.as_micros() as i64);
        if let Some(message) = self.server.tick(now) {
            self.snapshots_sent += 1;
            self.network.send(message.encode());
        }
    }

    fn client_frame(&mut self, report: &mut SimulationReport, last_rendered: &mut Option<Position>) {
        report.frames += 1;
        let dt = self.frame_interval.as_secs_f64();

        let Some(sample) = self.replica.tick(dt) else {
            report.empty_frames += 1;
            return;
        };

        match sample.outcome {
            StepOutcome::Interpolating => {}
            StepOutcome::Holding => report.holding_frames += 1,
            StepOutcome::Starved => report.starved_frames += 1,
        }
        match self.replica.mode() {
            PlaybackMode::Nominal => report.nominal_frames += 1,
            PlaybackMode::CatchingUp => report.catching_up_frames += 1,
            PlaybackMode::SlowingDown => report.slowing_down_frames += 1,
        }

        report.min_t = report.min_t.min(sample.t);
        report.max_t = report.max_t.max(sample.t);
        report.max_buffered = report.max_buffered.max(self.replica.buffered());

        if let Some(previous) = last_rendered {
            report.max_frame_step = report.max_frame_step.max(previous.distance(&sample.value));
        }
        *last_rendered = Some(sample.value);

        if self.time >= self.config.warmup {
            report.max_abs_drift = report.max_abs_drift.max(self.replica.drift().abs());

            let truth = self
                .motion
                .position_at(ServerTime::from_secs_f64(self.replica.local_time()));
            report.record_render_error(f64::from(truth.distance(&sample.value)));
        }
    }

    pub fn replica(&self) -> &ClientReplica<Position> {
        &self.replica
    }

    pub fn network(&self) -> &ChaosNetwork {
        &self.network
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Global simulation time
    pub fn time(&self) -> Duration {
        self.time
    }
}

fn rate_to_interval(rate_hz: u32) -> Duration {
    Duration::from_secs_f64(1.0 / f64::from(rate_hz.max(1)))
}

/// Predefined scenarios
pub mod scenarios {
    use super::*;

    /// Send interval of the given replica config as a `Duration`
    fn send_interval(config: &ReplicaConfig) -> Duration {
        Duration::from_secs_f64(config.send_interval())
    }

    /// Clean 50 ms link
    pub fn ideal() -> MirageResult<ReplicationSimulator> {
        ReplicationSimulator::new(SimulationConfig {
            chaos: ChaosConfig::ideal(Duration::from_millis(50)),
            ..SimulationConfig::default()
        })
    }

    /// Latency swinging by half a send interval either way
    pub fn jittered() -> MirageResult<ReplicationSimulator> {
        let replica = ReplicaConfig::default();
        ReplicationSimulator::new(SimulationConfig {
            chaos: ChaosConfig::jittered(send_interval(&replica)),
            replica,
            ..SimulationConfig::default()
        })
    }

    /// Good network, client rendering at 144 Hz
    pub fn high_refresh() -> MirageResult<ReplicationSimulator> {
        ReplicationSimulator::new(SimulationConfig {
            client_frame_rate: 144,
            ..SimulationConfig::default()
        })
    }

    /// Loss, bursts, reordering and duplicates
    pub fn hostile() -> MirageResult<ReplicationSimulator> {
        ReplicationSimulator::new(SimulationConfig {
            chaos: ChaosConfig::hostile(),
            ..SimulationConfig::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ideal_link_plays_cleanly() {
        let mut sim = scenarios::ideal().unwrap();
        let report = sim.run(Duration::from_secs(5));

        assert_eq!(report.decode_errors, 0);
        assert_eq!(report.starved_frames, 0);
        assert_eq!(report.catching_up_frames + report.slowing_down_frames, 0);
        assert!(report.min_t >= 0.0 && report.max_t <= 1.0);
        assert!(report.mean_render_error < 0.05);
        assert_eq!(sim.replica().timescale(), 1.0);
    }

    #[test]
    fn test_controller_converges_under_jitter() {
        let mut sim = scenarios::jittered().unwrap();
        let interval = sim.config().replica.send_interval();

        let report = sim.run(Duration::from_secs(20));
        // Well inside the catch-up and slow-down thresholds
        assert!(interval * 0.5 < sim.config().replica.positive_threshold_secs());
        assert!(sim.replica().drift().abs() < 0.5 * interval);
        assert!(report.max_abs_drift < 0.5 * interval);
        // No oscillation between catching up and slowing down
        assert!(report.catching_up_frames + report.slowing_down_frames <= report.frames / 100);
        assert!(report.starvation_rate() < 0.05);
        assert!(report.max_buffered <= sim.config().replica.buffer_limit());

        // Jitter subsides: playback settles back to real time
        sim.set_chaos(ChaosConfig::ideal(Duration::from_millis(50)));
        sim.run(Duration::from_secs(10));
        assert_eq!(sim.replica().timescale(), 1.0);
        assert_eq!(sim.replica().mode(), PlaybackMode::Nominal);
    }

    #[test]
    fn test_good_network_renders_smoothly() {
        let mut sim = scenarios::high_refresh().unwrap();
        let report = sim.run(Duration::from_secs(10));

        let speed = sim.config().replica.server().speed;
        let frame = 1.0 / 144.0;
        // Never more than a few frames of travel in one step
        assert!(report.max_frame_step < speed * frame as f32 * 4.0);
        assert!(report.frames >= 1439);
    }

    #[test]
    fn test_hostile_network_degrades_gracefully() {
        let mut sim = scenarios::hostile().unwrap();
        let report = sim.run(Duration::from_secs(30));

        assert!(report.chaos.packets_lost > 0);
        assert!(report.replica.inserted > 0);
        assert!(report.min_t >= 0.0 && report.max_t <= 1.0);
        assert!(report.max_buffered <= sim.config().replica.buffer_limit());
        assert!(sim.replica().last_value().is_some());
    }

    #[test]
    fn test_runs_continue_from_previous_state() {
        let mut sim = scenarios::ideal().unwrap();
        sim.run(Duration::from_secs(1));
        let before = sim.replica().stats().inserted;

        sim.run(Duration::from_secs(1));
        assert!(sim.replica().stats().inserted > before);
        assert_eq!(sim.time(), Duration::from_secs(2));
    }

    #[test]
    fn test_no_samples_before_first_arrival() {
        let mut sim = scenarios::ideal().unwrap();
        // Shorter than the link latency
        let report = sim.run(Duration::from_millis(40));

        assert!(report.frames > 0);
        assert_eq!(report.empty_frames, report.frames);
    }
}
