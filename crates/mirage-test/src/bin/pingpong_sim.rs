//! Ping-pong replication demo
//!
//! Runs a server moving an entity back and forth, a chaos link and a client
//! replica, then prints how playback held up.
//!
//! ```text
//! pingpong-sim [--scenario ideal|good|poor|hostile|jittered] [--seconds N]
//!              [--seed N] [--config settings.json] [--realtime]
//! ```
//!
//! Set `RUST_LOG=mirage_time=debug` to watch timescale changes.

use std::thread;
use std::time::{Duration, Instant};

use mirage_core::{Position, ReplicaConfig, ServerTime, SnapshotMessage};
use mirage_source::{PingPong, ServerRuntime};
use mirage_test::{
    load_settings, ChaosConfig, ChaosNetwork, HarnessError, HarnessResult, ReplicationSimulator,
    SimulationConfig,
};
use mirage_time::{ClientReplica, FrameTimer, ReceiveClock};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

struct Options {
    scenario: String,
    seconds: u64,
    seed: u64,
    config: Option<String>,
    realtime: bool,
}

fn parse_args() -> HarnessResult<Options> {
    let mut options = Options {
        scenario: "jittered".to_string(),
        seconds: 20,
        seed: 0x5eed,
        config: None,
        realtime: false,
    };

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--scenario" => options.scenario = value(&mut args, &arg)?,
            "--seconds" => options.seconds = number(&mut args, &arg)?,
            "--seed" => options.seed = number(&mut args, &arg)?,
            "--config" => options.config = Some(value(&mut args, &arg)?),
            "--realtime" => options.realtime = true,
            other => return Err(HarnessError::Usage(format!("unknown argument {other}"))),
        }
    }
    Ok(options)
}

fn value(args: &mut impl Iterator<Item = String>, flag: &str) -> HarnessResult<String> {
    args.next()
        .ok_or_else(|| HarnessError::Usage(format!("{flag} needs a value")))
}

fn number(args: &mut impl Iterator<Item = String>, flag: &str) -> HarnessResult<u64> {
    let raw = value(args, flag)?;
    raw.parse()
        .map_err(|_| HarnessError::Usage(format!("{flag} expects a number, got {raw}")))
}

fn chaos_for(scenario: &str, replica: &ReplicaConfig) -> HarnessResult<ChaosConfig> {
    Ok(match scenario {
        "ideal" => ChaosConfig::ideal(Duration::from_millis(50)),
        "good" => ChaosConfig::good(),
        "poor" => ChaosConfig::poor(),
        "hostile" => ChaosConfig::hostile(),
        "jittered" => ChaosConfig::jittered(Duration::from_secs_f64(replica.send_interval())),
        other => return Err(HarnessError::Usage(format!("unknown scenario {other}"))),
    })
}

fn main() -> Result<(), HarnessError> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let options = parse_args()?;
    let replica = match &options.config {
        Some(path) => load_settings(path)?,
        None => ReplicaConfig::default(),
    };
    let chaos = chaos_for(&options.scenario, &replica)?;
    let duration = Duration::from_secs(options.seconds);

    info!(
        scenario = %options.scenario,
        send_rate = replica.server().send_rate,
        buffer_time_ms = replica.buffer_time() * 1000.0,
        "starting ping-pong replication"
    );

    if options.realtime {
        return run_realtime(replica, chaos, options.seed, duration);
    }

    let mut sim = ReplicationSimulator::new(SimulationConfig {
        replica,
        chaos,
        seed: options.seed,
        ..SimulationConfig::default()
    })?;
    let report = sim.run(duration);

    println!("=== MIRAGE ping-pong ({}) ===\n", options.scenario);
    println!("Frames:            {}", report.frames);
    println!("  holding:         {}", report.holding_frames);
    println!("  starved:         {} ({:.2}%)", report.starved_frames, report.starvation_rate() * 100.0);
    println!("  nominal:         {}", report.nominal_frames);
    println!("  catching up:     {}", report.catching_up_frames);
    println!("  slowing down:    {}", report.slowing_down_frames);
    println!("Snapshots sent:    {}", report.snapshots_sent);
    println!("Frames received:   {}", report.frames_received);
    println!("  inserted:        {}", report.replica.inserted);
    println!("  replaced:        {}", report.replica.replaced);
    println!("  stale:           {}", report.replica.stale);
    println!("  overflow:        {}", report.replica.overflow);
    println!("Link loss:         {:.2}%", report.chaos.loss_rate() * 100.0);
    println!("Link latency:      {:.1}ms avg, {:.1}ms max", report.chaos.avg_latency_ms(), report.chaos.max_latency_ms);
    println!("Max |drift|:       {:.2}ms", report.max_abs_drift * 1000.0);
    println!("Render error:      {:.4} avg, {:.4} max", report.mean_render_error, report.max_render_error);
    println!("Max frame step:    {:.4}", report.max_frame_step);
    println!("Final timescale:   {:.2}", sim.replica().timescale());

    Ok(())
}

/// Same loop driven by the wall clock at roughly 60 frames per second
fn run_realtime(
    replica_config: ReplicaConfig,
    chaos: ChaosConfig,
    seed: u64,
    duration: Duration,
) -> Result<(), HarnessError> {
    let motion = PingPong::from_settings(Position::ZERO, replica_config.server());
    let mut server = ServerRuntime::new(motion, replica_config.server())?;
    let mut network = ChaosNetwork::new(chaos, seed);
    let mut replica: ClientReplica<Position> = ClientReplica::new(replica_config);

    let clock = ReceiveClock::new();
    let mut frame_timer = FrameTimer::new();
    let frame_budget = Duration::from_secs_f64(1.0 / 60.0);
    let started = Instant::now();
    let mut frame: u64 = 0;

    while started.elapsed() < duration {
        let dt = frame_timer.tick();

        let received = clock.now();
        for bytes in network.tick(Duration::from_secs_f64(dt)) {
            match SnapshotMessage::decode(&bytes) {
                Ok(message) => {
                    replica.receive_message(message, received);
                }
                Err(err) => warn!(%err, "dropping undecodable frame"),
            }
        }

        let server_now = ServerTime::from_micros(received.as_micros() as i64);
        if let Some(message) = server.tick(server_now) {
            network.send(message.encode());
        }

        if let Some(sample) = replica.tick(dt) {
            if frame % 30 == 0 {
                println!(
                    "t={:7.3}s x={:+7.3} buffered={:2} scale={:.2} drift={:+6.1}ms",
                    replica.local_time(),
                    sample.value.x,
                    replica.buffered(),
                    replica.timescale(),
                    replica.drift() * 1000.0,
                );
            }
        }
        frame += 1;

        thread::sleep(frame_budget.saturating_sub(frame_timer.elapsed()));
    }

    info!(frames = frame, stats = ?replica.stats(), "realtime run finished");
    Ok(())
}
