//! Receiving side of live congestion control

use super::{pop_front_if, ReceiverEvents};
use crate::clock::{Clock, MonotonicClock, Timer};
use crate::config::{ConfigError, LiveRecvConfig, INITIAL_AVG_PAYLOAD_SIZE};
use crate::packet::DataPacket;
use crate::sequence::SeqNumber;
use crate::stats::{update_avg_payload, RateWindow, RecvStats, RATE_PERIOD_US};
use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use std::collections::VecDeque;
use std::fmt::Write;
use std::sync::Arc;

struct ReceiverState {
    /// Highest sequence number seen so far
    max_seen: SeqNumber,
    /// Highest sequence number covered by the last ACK
    last_ack: SeqNumber,
    /// Time of the last delivery pass
    last_pkt_tsbpd_time: u64,
    /// Received, not yet delivered; ordered by sequence number
    buffer: VecDeque<DataPacket>,
    packets_since_ack: u32,
    light_ack_threshold: u32,
    ack_timer: Timer,
    nak_timer: Timer,
    avg_payload_size: f64,
    stats: RecvStats,
    rate: RateWindow,
    events: Box<dyn ReceiverEvents>,
}

/// Live-mode receiving controller
///
/// Reorders incoming packets, reports losses and delivers packets once they
/// are acknowledged and their TSBPD deadline has passed.
pub struct LiveReceiver {
    state: RwLock<ReceiverState>,
    clock: Arc<dyn Clock>,
}

impl LiveReceiver {
    /// Create a receiver measuring its packet rate on the monotonic clock
    pub fn new(
        config: LiveRecvConfig,
        events: Box<dyn ReceiverEvents>,
    ) -> Result<Self, ConfigError> {
        Self::with_clock(config, events, Arc::new(MonotonicClock::new()))
    }

    pub fn with_clock(
        config: LiveRecvConfig,
        events: Box<dyn ReceiverEvents>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let before_first = config.initial_sequence().prev();
        let rate = RateWindow::new(RATE_PERIOD_US, clock.now_us());

        Ok(LiveReceiver {
            state: RwLock::new(ReceiverState {
                max_seen: before_first,
                last_ack: before_first,
                last_pkt_tsbpd_time: 0,
                buffer: VecDeque::new(),
                packets_since_ack: 0,
                light_ack_threshold: config.light_ack_threshold,
                ack_timer: Timer::new(config.periodic_ack_interval_us),
                nak_timer: Timer::new(config.periodic_nak_interval_us),
                avg_payload_size: INITIAL_AVG_PAYLOAD_SIZE,
                stats: RecvStats::default(),
                rate,
                events,
            }),
            clock,
        })
    }

    /// Accept a decoded packet from the network
    ///
    /// A packet that opens a forward gap triggers an immediate loss report
    /// for the missing range.
    pub fn push(&self, packet: DataPacket) {
        let mut guard = self.state.write();
        let state = &mut *guard;

        let seq = packet.seq_number();
        let len = packet.len();

        state.packets_since_ack = state.packets_since_ack.saturating_add(1);
        state.rate.record(len);
        state.stats.pkt_recv += 1;
        state.stats.byte_recv += len;
        state.avg_payload_size = update_avg_payload(state.avg_payload_size, len);

        if packet.tsbpd_time() < state.last_pkt_tsbpd_time {
            tracing::trace!(seq = %seq, tsbpd_time = packet.tsbpd_time(), "packet too late");
            state.discard(packet);
            return;
        }

        let expected = state.max_seen.next();

        if seq == expected {
            state.max_seen = seq;
        } else if seq.le(state.max_seen) {
            if seq.le(state.last_ack) {
                tracing::trace!(seq = %seq, last_ack = %state.last_ack, "packet already acknowledged");
                state.discard(packet);
                return;
            }

            match state
                .buffer
                .binary_search_by(|p| p.seq_number().cyclic_cmp(seq))
            {
                Ok(_) => {
                    tracing::trace!(seq = %seq, "duplicate packet");
                    state.discard(packet);
                }
                Err(index) => {
                    tracing::trace!(seq = %seq, "gap filled");
                    state.count_accepted(&packet);
                    state.buffer.insert(index, packet);
                }
            }
            return;
        } else {
            let gap_end = seq.prev();
            tracing::debug!(from = %expected, to = %gap_end, "loss detected");
            state.events.on_send_nak(expected, gap_end);

            let missing = expected.distance(seq) as u64;
            state.stats.pkt_rcv_loss += missing;
            state.stats.byte_rcv_loss += missing * state.avg_payload_size as u64;

            state.max_seen = seq;
        }

        state.count_accepted(&packet);
        state.buffer.push_back(packet);
    }

    /// Advance the receiver to `now` (µs)
    ///
    /// Sends a periodic or light ACK if one is due, then a periodic NAK if
    /// one is due, then delivers acknowledged packets whose deadline has
    /// passed.
    pub fn tick(&self, now: u64) {
        let mut guard = self.state.write();
        let state = &mut *guard;

        state.periodic_ack(now);
        state.periodic_nak(now);

        let last_ack = state.last_ack;
        while let Some(packet) = pop_front_if(&mut state.buffer, |p| {
            p.seq_number().le(last_ack) && p.tsbpd_time() <= now
        }) {
            state.stats.pkt_rcv_buf = state.stats.pkt_rcv_buf.saturating_sub(1);
            state.stats.byte_rcv_buf = state.stats.byte_rcv_buf.saturating_sub(packet.len());

            tracing::trace!(seq = %packet.seq_number(), now, "packet delivered");
            state.events.on_deliver(packet);
        }

        state.last_pkt_tsbpd_time = now;
    }

    /// Arrival rate as `(packets/s, bytes/s)` over the last full second
    ///
    /// Returns the cached figures until a new window has elapsed.
    pub fn packet_rate(&self) -> (u32, u32) {
        let now_us = self.clock.now_us();
        let state = self.state.upgradable_read();

        if !state.rate.is_due(now_us) {
            return rate_pair(&state.rate);
        }

        let mut state = RwLockUpgradableReadGuard::upgrade(state);
        state.rate.refresh(now_us);
        rate_pair(&state.rate)
    }

    /// Change the periodic NAK interval (µs), e.g. to follow the RTT
    pub fn set_nak_interval(&self, interval_us: u64) {
        self.state.write().nak_timer.set_interval(interval_us);
    }

    /// Statistics snapshot with the payload average merged in
    pub fn stats(&self) -> RecvStats {
        let state = self.state.read();

        let mut stats = state.stats;
        stats.byte_payload = state.avg_payload_size as u64;
        stats
    }

    pub fn max_seen_sequence(&self) -> SeqNumber {
        self.state.read().max_seen
    }

    pub fn last_ack_sequence(&self) -> SeqNumber {
        self.state.read().last_ack
    }

    /// Drop every buffered packet
    pub fn flush(&self) {
        let mut state = self.state.write();

        state.buffer.clear();
        state.stats.pkt_rcv_buf = 0;
        state.stats.byte_rcv_buf = 0;
    }

    /// Human-readable dump of the reorder buffer relative to `now`
    pub fn describe(&self, now: u64) -> String {
        let state = self.state.read();

        let mut out = format!("maxSeen={} lastACK={}\n", state.max_seen, state.last_ack);
        for packet in &state.buffer {
            let _ = writeln!(
                out,
                "   {} @ {} (in {})",
                packet.seq_number(),
                packet.tsbpd_time(),
                packet.tsbpd_time() as i64 - now as i64
            );
        }
        out
    }
}

impl ReceiverState {
    fn discard(&mut self, packet: DataPacket) {
        self.stats.pkt_rcv_drop += 1;
        self.stats.byte_rcv_drop += packet.len();
        packet.decommission();
    }

    fn count_accepted(&mut self, packet: &DataPacket) {
        let len = packet.len();

        self.stats.pkt_rcv_buf += 1;
        self.stats.byte_rcv_buf += len;
        self.stats.pkt_recv_unique += 1;
        self.stats.byte_recv_unique += len;

        if packet.is_retransmitted() {
            self.stats.pkt_rcv_retrans += 1;
            self.stats.byte_rcv_retrans += len;
        }
    }

    fn periodic_ack(&mut self, now: u64) {
        let lite = if self.ack_timer.expired(now) {
            false
        } else if self.packets_since_ack >= self.light_ack_threshold {
            true
        } else {
            return;
        };

        self.ack_timer.reset(now);
        self.packets_since_ack = 0;

        // Nothing to acknowledge while the buffer is empty.
        let mut packets = self.buffer.iter();
        let Some(front) = packets.next() else {
            return;
        };

        // Everything up to the first gap whose deadline has already passed.
        // A front packet that is not contiguous with the last ACK is still
        // acknowledged once its deadline passed: the missing ones can no
        // longer be delivered in time.
        if front.tsbpd_time() <= self.last_pkt_tsbpd_time {
            let mut ack = front.seq_number();
            for packet in packets {
                if packet.seq_number() != ack.next()
                    || packet.tsbpd_time() > self.last_pkt_tsbpd_time
                {
                    break;
                }
                ack = packet.seq_number();
            }
            self.last_ack = ack;
        }

        let ack_seq = self.last_ack.next();
        tracing::debug!(ack = %ack_seq, lite, "sending ACK");
        self.events.on_send_ack(ack_seq, lite);
    }

    fn periodic_nak(&mut self, now: u64) {
        if !self.nak_timer.try_fire(now) {
            return;
        }

        let mut packets = self.buffer.iter();
        let mut prev = match packets.next() {
            Some(front) => front.seq_number(),
            None => return,
        };

        for packet in packets {
            let seq = packet.seq_number();
            if seq != prev.next() {
                let (from, to) = (prev.next(), seq.prev());
                tracing::debug!(from = %from, to = %to, "sending periodic NAK");
                self.events.on_send_nak(from, to);
                return;
            }
            prev = seq;
        }
    }
}

fn rate_pair(rate: &RateWindow) -> (u32, u32) {
    (
        rate.packets_per_sec() as u32,
        rate.bytes_per_sec() as u32,
    )
}
