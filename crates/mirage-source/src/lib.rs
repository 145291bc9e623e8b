//! MIRAGE Source - the authoritative side of the replication loop
//!
//! - Motion sources sampled once per server tick
//! - Send cadence at `1 / send_rate`
//! - Server runtime tying both to the wire message

pub mod motion;
pub mod runtime;
pub mod sender;

pub use motion::*;
pub use runtime::*;
pub use sender::*;
