//! Configuration file support for the simulator

use serde::{Deserialize, Serialize};
use srt_live::packet::MAX_PAYLOAD_SIZE;
use srt_live::{LiveRecvConfig, LiveSendConfig};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Simulated network path between sender and receiver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Probability that a data packet is lost (0.0 to 1.0)
    pub loss_rate: f64,
    /// Probability that a data packet arrives twice (0.0 to 1.0)
    pub duplicate_rate: f64,
    /// One-way delay in microseconds
    pub latency_us: u64,
    /// Seed for the loss/duplication generator
    pub seed: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        LinkConfig {
            loss_rate: 0.0,
            duplicate_rate: 0.0,
            latency_us: 20_000,
            seed: 1,
        }
    }
}

/// Workload and timing of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Number of packets the application pushes
    pub packets: u64,
    /// Payload size of each packet in bytes
    pub payload_size: usize,
    /// Time between two application pushes (µs)
    pub packet_interval_us: u64,
    /// TSBPD latency added to the send time to form the delivery deadline (µs)
    pub latency_us: u64,
    /// Time between controller ticks (µs)
    pub tick_interval_us: u64,
    /// Statistics interval in seconds of simulated time
    pub stats_interval_secs: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            packets: 1_000,
            payload_size: 1316,
            packet_interval_us: 1_000,
            latency_us: 120_000,
            tick_interval_us: 1_000,
            stats_interval_secs: 1,
        }
    }
}

impl RunConfig {
    /// Get statistics interval as Duration
    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.stats_interval_secs)
    }
}

/// Combined simulator configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub sender: LiveSendConfig,
    pub receiver: LiveRecvConfig,
    pub link: LinkConfig,
    pub run: RunConfig,
}

impl SimConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: SimConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Example configuration: a lossy link with a 120 ms buffer
    pub fn example() -> Self {
        SimConfig {
            sender: LiveSendConfig {
                initial_sequence_number: 1000,
                ..LiveSendConfig::default()
            },
            receiver: LiveRecvConfig {
                initial_sequence_number: 1000,
                ..LiveRecvConfig::default()
            },
            link: LinkConfig {
                loss_rate: 0.02,
                duplicate_rate: 0.005,
                ..LinkConfig::default()
            },
            run: RunConfig {
                packets: 5_000,
                ..RunConfig::default()
            },
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.sender.validate()?;
        self.receiver.validate()?;

        if self.sender.initial_sequence_number != self.receiver.initial_sequence_number {
            return Err(ConfigError::Invalid(format!(
                "sender starts at sequence {} but receiver expects {}",
                self.sender.initial_sequence_number, self.receiver.initial_sequence_number
            )));
        }

        for (name, rate) in [
            ("loss_rate", self.link.loss_rate),
            ("duplicate_rate", self.link.duplicate_rate),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(ConfigError::Invalid(format!(
                    "{} must be within 0.0..=1.0, got {}",
                    name, rate
                )));
            }
        }

        if self.run.payload_size == 0 || self.run.payload_size > MAX_PAYLOAD_SIZE {
            return Err(ConfigError::Invalid(format!(
                "payload_size must be within 1..={}, got {}",
                MAX_PAYLOAD_SIZE, self.run.payload_size
            )));
        }
        if self.run.packet_interval_us == 0 || self.run.tick_interval_us == 0 {
            return Err(ConfigError::Invalid(
                "packet and tick intervals must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Invalid controller configuration: {0}")]
    Controller(#[from] srt_live::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
