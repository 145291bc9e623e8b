//! MIRAGE Core - Fundamental types for snapshot replication
//!
//! This crate defines the types shared by the server and client halves:
//! - Time primitives (ServerTime, ReceiveTime)
//! - Snapshots and interpolable payloads
//! - Replication settings and their validation
//! - The snapshot wire codec

pub mod time;
pub mod snapshot;
pub mod config;
pub mod wire;
pub mod error;

pub use time::*;
pub use snapshot::*;
pub use config::*;
pub use wire::*;
pub use error::*;
