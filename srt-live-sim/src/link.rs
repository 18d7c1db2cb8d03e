//! In-memory network path with loss, duplication and fixed delay

use crate::config::LinkConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

/// One direction of a simulated path
///
/// Items come out in the order they went in, `latency_us` after being sent.
pub struct LossyLink<T> {
    rng: StdRng,
    loss_rate: f64,
    duplicate_rate: f64,
    latency_us: u64,
    in_flight: VecDeque<(u64, T)>,
    dropped: u64,
    duplicated: u64,
}

impl<T: Clone> LossyLink<T> {
    pub fn new(config: &LinkConfig) -> Self {
        LossyLink {
            rng: StdRng::seed_from_u64(config.seed),
            loss_rate: config.loss_rate,
            duplicate_rate: config.duplicate_rate,
            latency_us: config.latency_us,
            in_flight: VecDeque::new(),
            dropped: 0,
            duplicated: 0,
        }
    }

    /// A link that only delays
    pub fn lossless(latency_us: u64) -> Self {
        Self::new(&LinkConfig {
            loss_rate: 0.0,
            duplicate_rate: 0.0,
            latency_us,
            seed: 0,
        })
    }

    pub fn send(&mut self, now: u64, item: T) {
        if self.loss_rate > 0.0 && self.rng.gen_bool(self.loss_rate) {
            self.dropped += 1;
            return;
        }

        let arrival = now + self.latency_us;
        if self.duplicate_rate > 0.0 && self.rng.gen_bool(self.duplicate_rate) {
            self.duplicated += 1;
            self.in_flight.push_back((arrival, item.clone()));
        }
        self.in_flight.push_back((arrival, item));
    }

    /// Take everything that has arrived by `now`
    pub fn receive(&mut self, now: u64) -> Vec<T> {
        let mut arrived = Vec::new();
        while self.in_flight.front().map_or(false, |(at, _)| *at <= now) {
            if let Some((_, item)) = self.in_flight.pop_front() {
                arrived.push(item);
            }
        }
        arrived
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn duplicated(&self) -> u64 {
        self.duplicated
    }
}
