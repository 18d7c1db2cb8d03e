//! SRT Live Congestion Control
//!
//! This crate implements the live-mode (LiveCC) sender and receiver
//! controllers of SRT: sequence numbering with 31-bit wrap-around, send and
//! loss buffers, ACK/NAK handling, retransmission, pacing and TSBPD-gated
//! delivery, together with their statistics.
//!
//! The controllers do no I/O. They are driven by `tick(now)` plus protocol
//! events and report back through the [`SenderEvents`] and
//! [`ReceiverEvents`] sinks.

pub mod clock;
pub mod config;
pub mod congestion;
pub mod loss;
pub mod packet;
pub mod sequence;
pub mod stats;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{ConfigError, LiveRecvConfig, LiveSendConfig};
pub use congestion::{LiveReceiver, LiveSender, NoopEvents, ReceiverEvents, SenderEvents};
pub use loss::LossRange;
pub use packet::{DataPacket, PacketHeader};
pub use sequence::SeqNumber;
pub use stats::{RecvStats, SendStats};
