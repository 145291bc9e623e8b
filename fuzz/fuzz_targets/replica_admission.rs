#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use mirage_core::{Position, ReceiveTime, ReplicaConfig, ServerTime, Snapshot};
use mirage_time::ClientReplica;

#[derive(Arbitrary, Debug)]
enum Event {
    Receive { server_ms: u16, received_ms: u16 },
    Tick { dt_ms: u8 },
    Reset,
}

fuzz_target!(|events: Vec<Event>| {
    let config = ReplicaConfig::default();
    let limit = config.buffer_limit();
    let mut replica: ClientReplica<Position> = ClientReplica::new(config);
    let mut last_pair: Option<(ServerTime, ServerTime)> = None;

    for event in events {
        match event {
            Event::Receive { server_ms, received_ms } => {
                let snapshot = Snapshot::new(
                    ServerTime::from_millis(i64::from(server_ms)),
                    Position::new(f32::from(server_ms), 0.0, 0.0),
                )
                .with_received_time(ReceiveTime::from_millis(u64::from(received_ms)));
                replica.receive(snapshot);
                assert!(replica.buffered() <= limit);
            }
            Event::Tick { dt_ms } => {
                if let Some(sample) = replica.tick(f64::from(dt_ms) / 1000.0) {
                    assert!((0.0..=1.0).contains(&sample.t));
                    assert!(sample.from.server_time <= sample.to.server_time);
                    if let Some((from, to)) = last_pair {
                        assert!(sample.from.server_time >= from);
                        assert!(sample.to.server_time >= to);
                    }
                    last_pair = Some((sample.from.server_time, sample.to.server_time));
                }
            }
            Event::Reset => {
                replica.reset();
                last_pair = None;
            }
        }
    }
});
