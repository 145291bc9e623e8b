//! MIRAGE Test Harness - Chaos testing and replication validation
//!
//! This crate provides:
//! - Jitter, loss and reorder chaos for snapshot frames
//! - End-to-end replication simulation with ground-truth comparison
//! - Settings loading for harness runs

pub mod chaos;
pub mod settings;
pub mod simulator;

pub use chaos::*;
pub use settings::*;
pub use simulator::*;
