//! SRT Live Simulator Library
//!
//! Drives a live sender and receiver against each other over an in-memory
//! lossy link. Used by the `srt-live-sim` binary and by integration tests.

pub mod config;
pub mod link;
pub mod sim;
pub mod stats;

pub use config::{ConfigError, LinkConfig, RunConfig, SimConfig};
pub use link::LossyLink;
pub use sim::{SimReport, Simulation};
pub use stats::{
    compact_stats, display_receiver_stats, display_sender_stats, format_bandwidth, format_bytes,
};
