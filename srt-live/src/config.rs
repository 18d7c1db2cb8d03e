//! Controller configuration
//!
//! Both configs deserialize from TOML sections with every field optional;
//! missing fields take the defaults below.

use crate::packet::MAX_PAYLOAD_SIZE;
use crate::sequence::{SeqNumber, MAX_SEQ_NUMBER};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bandwidth ceiling used when none is configured: 1 Gbit/s in bytes/s
pub const DEFAULT_MAX_BW: f64 = 128.0 * 1024.0 * 1024.0;

/// Average payload size assumed before any packet has been seen
pub const INITIAL_AVG_PAYLOAD_SIZE: f64 = MAX_PAYLOAD_SIZE as f64;

/// Packets since the last ACK after which a light ACK is sent early
pub const DEFAULT_LIGHT_ACK_THRESHOLD: u32 = 64;

/// Configuration errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("initial sequence number {0} exceeds maximum {max}", max = MAX_SEQ_NUMBER)]
    InitialSequenceOutOfRange(u32),

    #[error("{0} interval must be greater than zero")]
    ZeroInterval(&'static str),

    #[error("light ACK threshold must be greater than zero")]
    ZeroLightAckThreshold,

    #[error("bandwidth overhead {0}% is outside 0..=100")]
    OverheadOutOfRange(i64),
}

/// Sender-side live congestion control settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveSendConfig {
    /// First sequence number handed out
    pub initial_sequence_number: u32,
    /// How long a delivered packet stays retransmittable past its deadline (µs)
    pub drop_interval_us: u64,
    /// Bandwidth ceiling in bytes/s; negative means "use the 1 Gbit/s default",
    /// zero means "derive from the input rate"
    pub max_bw: i64,
    /// Expected input rate in bytes/s (0 = estimate it)
    pub input_bw: i64,
    /// Floor for the estimated input rate in bytes/s
    pub min_input_bw: i64,
    /// Headroom on top of the input rate, in percent
    pub overhead_bw: i64,
}

impl Default for LiveSendConfig {
    fn default() -> Self {
        LiveSendConfig {
            initial_sequence_number: 0,
            drop_interval_us: 1_000_000,
            max_bw: -1,
            input_bw: 0,
            min_input_bw: 0,
            overhead_bw: 25,
        }
    }
}

impl LiveSendConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_initial_sequence(self.initial_sequence_number)?;

        if !(0..=100).contains(&self.overhead_bw) {
            return Err(ConfigError::OverheadOutOfRange(self.overhead_bw));
        }

        Ok(())
    }

    pub fn initial_sequence(&self) -> SeqNumber {
        SeqNumber::new_unchecked(self.initial_sequence_number)
    }

    /// Effective bandwidth ceiling in bytes/s
    ///
    /// `estimated_input_bw` is the sender's own measurement, used only when
    /// neither `max_bw` nor `input_bw` pins the rate.
    pub fn effective_max_bw(&self, estimated_input_bw: f64) -> f64 {
        if self.max_bw > 0 {
            return self.max_bw as f64;
        }
        if self.max_bw < 0 {
            return DEFAULT_MAX_BW;
        }

        let input = if self.input_bw > 0 {
            self.input_bw as f64
        } else {
            estimated_input_bw.max(self.min_input_bw as f64)
        };

        let bw = input * (100 + self.overhead_bw) as f64 / 100.0;
        if bw > 0.0 {
            bw
        } else {
            DEFAULT_MAX_BW
        }
    }
}

/// Receiver-side live congestion control settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveRecvConfig {
    /// First sequence number expected from the peer
    pub initial_sequence_number: u32,
    /// Interval between full ACKs (µs)
    pub periodic_ack_interval_us: u64,
    /// Interval between periodic NAK reports (µs)
    pub periodic_nak_interval_us: u64,
    /// Packets since the last ACK that trigger a light ACK
    pub light_ack_threshold: u32,
}

impl Default for LiveRecvConfig {
    fn default() -> Self {
        LiveRecvConfig {
            initial_sequence_number: 0,
            periodic_ack_interval_us: 10_000,
            periodic_nak_interval_us: 20_000,
            light_ack_threshold: DEFAULT_LIGHT_ACK_THRESHOLD,
        }
    }
}

impl LiveRecvConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_initial_sequence(self.initial_sequence_number)?;

        if self.periodic_ack_interval_us == 0 {
            return Err(ConfigError::ZeroInterval("ACK"));
        }
        if self.periodic_nak_interval_us == 0 {
            return Err(ConfigError::ZeroInterval("NAK"));
        }
        if self.light_ack_threshold == 0 {
            return Err(ConfigError::ZeroLightAckThreshold);
        }

        Ok(())
    }

    pub fn initial_sequence(&self) -> SeqNumber {
        SeqNumber::new_unchecked(self.initial_sequence_number)
    }
}

fn validate_initial_sequence(value: u32) -> Result<(), ConfigError> {
    if value > MAX_SEQ_NUMBER {
        Err(ConfigError::InitialSequenceOutOfRange(value))
    } else {
        Ok(())
    }
}
