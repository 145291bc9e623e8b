//! MIRAGE Playback Engine - client-side snapshot interpolation
//!
//! This crate implements the observing client's half of replication:
//! - Exponential moving averages over noisy timing samples
//! - A time-keyed, bounded snapshot buffer and its admission policy
//! - An adaptive timescale controller that keeps a target lookahead
//! - The interpolation stepper driving a local virtual timeline
//! - `ClientReplica`, which owns all of the above for one observed entity

pub mod admission;
pub mod buffer;
pub mod clock;
pub mod controller;
pub mod delivery;
pub mod ema;
pub mod interpolation;
pub mod replica;

pub use admission::*;
pub use buffer::*;
pub use clock::*;
pub use controller::*;
pub use delivery::*;
pub use ema::*;
pub use interpolation::*;
pub use replica::*;
