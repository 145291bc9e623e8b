//! Snapshot wire codec
//!
//! A snapshot message is a fixed 20-byte little-endian frame:
//! - Bytes 0-7: Server time (i64, microseconds)
//! - Bytes 8-11: Position x (f32)
//! - Bytes 12-15: Position y (f32)
//! - Bytes 16-19: Position z (f32)
//!
//! Receive time is never sent; the client stamps it on arrival.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::{MirageError, MirageResult, Position, PositionSnapshot, ReceiveTime, ServerTime, Snapshot};

/// Encoded snapshot message size in bytes
pub const SNAPSHOT_MESSAGE_SIZE: usize = 20;

/// What the server sends for every snapshot
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SnapshotMessage {
    pub server_time: ServerTime,
    pub position: Position,
}

impl SnapshotMessage {
    pub fn new(server_time: ServerTime, position: Position) -> Self {
        SnapshotMessage {
            server_time,
            position,
        }
    }

    /// Serialize into a new buffer
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(SNAPSHOT_MESSAGE_SIZE);
        self.encode_into(&mut buf);
        buf.freeze()
    }

    /// Append the encoded message to an existing buffer
    pub fn encode_into(&self, buf: &mut impl BufMut) {
        buf.put_i64_le(self.server_time.as_micros());
        buf.put_f32_le(self.position.x);
        buf.put_f32_le(self.position.y);
        buf.put_f32_le(self.position.z);
    }

    /// Parse a message from bytes
    pub fn decode(mut buf: &[u8]) -> MirageResult<Self> {
        if buf.len() < SNAPSHOT_MESSAGE_SIZE {
            return Err(MirageError::BufferTooShort {
                expected: SNAPSHOT_MESSAGE_SIZE,
                actual: buf.len(),
            });
        }

        let server_time = ServerTime::from_micros(buf.get_i64_le());
        let position = Position::new(buf.get_f32_le(), buf.get_f32_le(), buf.get_f32_le());

        if !position.is_finite() {
            return Err(MirageError::InvalidWireFormat(
                "non-finite position component".into(),
            ));
        }

        Ok(SnapshotMessage {
            server_time,
            position,
        })
    }

    /// Turn the message into a client-side snapshot stamped with its arrival time
    pub fn into_snapshot(self, received_time: ReceiveTime) -> PositionSnapshot {
        Snapshot::new(self.server_time, self.position).with_received_time(received_time)
    }
}
