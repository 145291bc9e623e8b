//! Benchmarks for MIRAGE playback operations

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use mirage_core::{Position, ReceiveTime, ReplicaConfig, ServerTime, Snapshot, SnapshotMessage};
use mirage_test::{scenarios, ReplicationSimulator, SimulationConfig};
use mirage_time::{ClientReplica, ExponentialMovingAverage};

const INTERVAL_US: i64 = 33_333;

fn snapshot(i: i64) -> Snapshot<Position> {
    Snapshot::new(ServerTime::from_micros(i * INTERVAL_US), Position::new(i as f32, 0.0, 0.0))
        .with_received_time(ReceiveTime::from_micros((i * INTERVAL_US) as u64 + 50_000))
}

fn bench_ema_update(c: &mut Criterion) {
    let mut ema = ExponentialMovingAverage::new(30.0);

    c.bench_function("ema_update", |b| {
        let mut i = 0u32;
        b.iter(|| {
            i = i.wrapping_add(1);
            black_box(ema.update(black_box(f64::from(i % 7) * 0.001)))
        })
    });
}

fn bench_replica_receive(c: &mut Criterion) {
    c.bench_function("replica_receive", |b| {
        let mut replica: ClientReplica<Position> = ClientReplica::new(ReplicaConfig::default());
        let mut i = 0i64;
        b.iter(|| {
            i += 1;
            let outcome = replica.receive(black_box(snapshot(i)));
            // Keep the buffer from filling up
            replica.tick(INTERVAL_US as f64 / 1_000_000.0);
            black_box(outcome)
        })
    });
}

fn bench_replica_tick(c: &mut Criterion) {
    let mut replica: ClientReplica<Position> = ClientReplica::new(ReplicaConfig::default());
    for i in 0..16 {
        replica.receive(snapshot(i));
    }

    c.bench_function("replica_tick_holding", |b| {
        b.iter(|| black_box(replica.tick(black_box(0.0))))
    });
}

fn bench_wire_roundtrip(c: &mut Criterion) {
    let message = SnapshotMessage::new(ServerTime::from_millis(1234), Position::new(1.0, 2.0, 3.0));

    c.bench_function("wire_encode_decode", |b| {
        b.iter(|| {
            let bytes = black_box(message).encode();
            black_box(SnapshotMessage::decode(&bytes))
        })
    });
}

fn bench_simulator_second(c: &mut Criterion) {
    c.bench_function("simulator_one_second_good", |b| {
        b.iter(|| {
            let mut sim = ReplicationSimulator::new(SimulationConfig::default())
                .expect("default simulation config");
            black_box(sim.run(Duration::from_secs(1)))
        })
    });

    c.bench_function("simulator_one_second_hostile", |b| {
        b.iter(|| {
            let mut sim = scenarios::hostile().expect("hostile scenario");
            black_box(sim.run(Duration::from_secs(1)))
        })
    });
}

criterion_group!(
    benches,
    bench_ema_update,
    bench_replica_receive,
    bench_replica_tick,
    bench_wire_roundtrip,
    bench_simulator_second,
);

criterion_main!(benches);
