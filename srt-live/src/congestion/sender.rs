//! Sending side of live congestion control

use super::{pacing_period_us, pop_front_if, SenderEvents};
use crate::clock::{Clock, MonotonicClock};
use crate::config::{ConfigError, LiveSendConfig, INITIAL_AVG_PAYLOAD_SIZE};
use crate::loss::LossRange;
use crate::packet::{truncate_timestamp, DataPacket};
use crate::sequence::SeqNumber;
use crate::stats::{update_avg_payload, RateWindow, SendStats, RATE_PERIOD_US};
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

struct SenderState {
    config: LiveSendConfig,
    next_seq: SeqNumber,
    /// Pushed, not yet due; ordered by deadline
    send_buffer: VecDeque<DataPacket>,
    /// Sent, waiting for ACK or expiry; ordered by deadline
    loss_list: VecDeque<DataPacket>,
    avg_payload_size: f64,
    /// Pacing period (µs)
    pkt_snd_period: f64,
    stats: SendStats,
    input_rate: RateWindow,
    events: Box<dyn SenderEvents>,
}

/// Live-mode sending controller
///
/// Assigns sequence numbers, releases packets to the network once their
/// deadline is reached and keeps them around for retransmission until they
/// are acknowledged or `drop_interval_us` past their deadline.
pub struct LiveSender {
    state: RwLock<SenderState>,
    clock: Arc<dyn Clock>,
}

impl LiveSender {
    /// Create a sender measuring its input rate on the monotonic clock
    pub fn new(config: LiveSendConfig, events: Box<dyn SenderEvents>) -> Result<Self, ConfigError> {
        Self::with_clock(config, events, Arc::new(MonotonicClock::new()))
    }

    pub fn with_clock(
        config: LiveSendConfig,
        events: Box<dyn SenderEvents>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let avg_payload_size = INITIAL_AVG_PAYLOAD_SIZE;
        let pkt_snd_period = pacing_period_us(avg_payload_size, config.effective_max_bw(0.0));
        let input_rate = RateWindow::new(RATE_PERIOD_US, clock.now_us());

        Ok(LiveSender {
            state: RwLock::new(SenderState {
                next_seq: config.initial_sequence(),
                config,
                send_buffer: VecDeque::new(),
                loss_list: VecDeque::new(),
                avg_payload_size,
                pkt_snd_period,
                stats: SendStats::default(),
                input_rate,
                events,
            }),
            clock,
        })
    }

    /// Queue a packet for sending
    ///
    /// Packets are expected in deadline order. Returns the sequence number
    /// assigned to the packet.
    pub fn push(&self, mut packet: DataPacket) -> SeqNumber {
        let now_us = self.clock.now_us();
        let mut guard = self.state.write();
        let state = &mut *guard;

        let seq = state.next_seq;
        state.next_seq.increment();

        packet.header.seq = seq;
        packet.header.timestamp = truncate_timestamp(packet.header.tsbpd_time);
        packet.header.retransmitted = false;

        let len = packet.len();
        state.stats.pkt_snd_buf += 1;
        state.stats.byte_snd_buf += len;

        state.input_rate.record(len);
        if state.input_rate.is_due(now_us) {
            state.input_rate.refresh(now_us);
            state.stats.estimated_input_bw = state.input_rate.bytes_per_sec();
        }

        if let Some(last) = state.send_buffer.back() {
            if packet.tsbpd_time() < last.tsbpd_time() {
                tracing::warn!(
                    seq = %seq,
                    tsbpd_time = packet.tsbpd_time(),
                    previous = last.tsbpd_time(),
                    "packet pushed out of deadline order"
                );
            }
        }

        tracing::trace!(seq = %seq, tsbpd_time = packet.tsbpd_time(), len, "packet queued");
        state.send_buffer.push_back(packet);

        seq
    }

    /// Advance the sender to `now` (µs)
    ///
    /// Sends every packet whose deadline has been reached, then purges loss
    /// list entries that outlived the drop interval.
    pub fn tick(&self, now: u64) {
        let mut guard = self.state.write();
        let state = &mut *guard;

        while let Some(packet) = pop_front_if(&mut state.send_buffer, |p| p.tsbpd_time() <= now) {
            let len = packet.len();

            state.stats.pkt_sent += 1;
            state.stats.pkt_sent_unique += 1;
            state.stats.byte_sent += len;
            state.stats.byte_sent_unique += len;

            state.avg_payload_size = update_avg_payload(state.avg_payload_size, len);

            tracing::trace!(seq = %packet.seq_number(), now, "packet sent");
            state.events.on_deliver(&packet);
            state.loss_list.push_back(packet);
        }

        let drop_interval = state.config.drop_interval_us;
        while let Some(packet) = pop_front_if(&mut state.loss_list, |p| {
            p.tsbpd_time().saturating_add(drop_interval) <= now
        }) {
            let len = packet.len();

            state.stats.pkt_snd_drop += 1;
            state.stats.pkt_snd_loss += 1;
            state.stats.byte_snd_drop += len;
            state.stats.byte_snd_loss += len;

            state.stats.pkt_snd_buf = state.stats.pkt_snd_buf.saturating_sub(1);
            state.stats.byte_snd_buf = state.stats.byte_snd_buf.saturating_sub(len);

            tracing::debug!(seq = %packet.seq_number(), now, "unacknowledged packet dropped");
            packet.decommission();
        }

        state.stats.pkt_flight_size = state.loss_list.len() as u64;
    }

    /// Handle an ACK: every packet before `seq` has arrived
    pub fn ack(&self, seq: SeqNumber) {
        let mut guard = self.state.write();
        let state = &mut *guard;

        let mut acked = 0u32;
        while let Some(packet) = pop_front_if(&mut state.loss_list, |p| p.seq_number().lt(seq)) {
            let len = packet.len();
            state.stats.pkt_snd_buf = state.stats.pkt_snd_buf.saturating_sub(1);
            state.stats.byte_snd_buf = state.stats.byte_snd_buf.saturating_sub(len);

            packet.decommission();
            acked += 1;
        }

        state.stats.pkt_flight_size = state.loss_list.len() as u64;

        let max_bw = state.config.effective_max_bw(state.stats.estimated_input_bw);
        state.pkt_snd_period = pacing_period_us(state.avg_payload_size, max_bw);

        tracing::debug!(ack = %seq, acked, period_us = state.pkt_snd_period, "ACK processed");
    }

    /// Handle a NAK carrying a flat list of inclusive `(from, to)` pairs
    ///
    /// Every retained packet inside a reported range is sent again, newest
    /// first. Packets stay retained: only an ACK or the drop interval
    /// removes them.
    pub fn nak(&self, sequence_numbers: &[SeqNumber]) {
        let ranges: Vec<LossRange> = LossRange::from_pairs(sequence_numbers).collect();
        if ranges.is_empty() {
            return;
        }

        let mut guard = self.state.write();
        let state = &mut *guard;

        for packet in state.loss_list.iter_mut().rev() {
            let seq = packet.seq_number();
            if !ranges.iter().any(|range| range.contains(seq)) {
                continue;
            }

            let len = packet.len();
            state.stats.pkt_retrans += 1;
            state.stats.pkt_sent += 1;
            state.stats.pkt_snd_loss += 1;
            state.stats.byte_retrans += len;
            state.stats.byte_sent += len;
            state.stats.byte_snd_loss += len;

            state.avg_payload_size = update_avg_payload(state.avg_payload_size, len);

            packet.header.retransmitted = true;

            tracing::debug!(seq = %seq, "retransmitting packet");
            state.events.on_deliver(packet);
        }
    }

    /// Statistics snapshot with the pacing period and payload average merged in
    pub fn stats(&self) -> SendStats {
        let state = self.state.read();

        let mut stats = state.stats;
        stats.us_pkt_snd_period = state.pkt_snd_period;
        stats.byte_payload = state.avg_payload_size as u64;
        stats
    }

    /// Current inter-packet pacing period
    pub fn send_period(&self) -> Duration {
        Duration::from_secs_f64(self.state.read().pkt_snd_period / 1_000_000.0)
    }

    /// Sequence number the next pushed packet will get
    pub fn next_sequence_number(&self) -> SeqNumber {
        self.state.read().next_seq
    }

    /// Drop everything the sender holds
    pub fn flush(&self) {
        let mut state = self.state.write();

        state.send_buffer.clear();
        state.loss_list.clear();

        state.stats.pkt_snd_buf = 0;
        state.stats.byte_snd_buf = 0;
        state.stats.pkt_flight_size = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use bytes::Bytes;
    use parking_lot::Mutex;

    #[derive(Clone, Default)]
    struct Recorder {
        sent: Arc<Mutex<Vec<(SeqNumber, bool)>>>,
    }

    impl SenderEvents for Recorder {
        fn on_deliver(&mut self, packet: &DataPacket) {
            self.sent
                .lock()
                .push((packet.seq_number(), packet.is_retransmitted()));
        }
    }

    impl Recorder {
        fn take(&self) -> Vec<(SeqNumber, bool)> {
            std::mem::take(&mut *self.sent.lock())
        }
    }

    fn sender(drop_interval_us: u64) -> (LiveSender, Recorder, ManualClock) {
        let recorder = Recorder::default();
        let clock = ManualClock::new(0);
        let config = LiveSendConfig {
            initial_sequence_number: 1,
            drop_interval_us,
            ..LiveSendConfig::default()
        };
        let sender =
            LiveSender::with_clock(config, Box::new(recorder.clone()), Arc::new(clock.clone()))
                .unwrap();
        (sender, recorder, clock)
    }

    fn packet(tsbpd_time: u64, len: usize) -> DataPacket {
        DataPacket::new(0, tsbpd_time, Bytes::from(vec![0u8; len]))
    }

    fn seq(value: u32) -> SeqNumber {
        SeqNumber::new(value)
    }

    #[test]
    fn test_push_assigns_sequence_and_timestamp() {
        let (sender, _, _) = sender(1_000);

        let deadline = u32::MAX as u64 + 11;
        assert_eq!(sender.push(packet(deadline, 100)), seq(1));
        assert_eq!(sender.push(packet(deadline + 1, 100)), seq(2));
        assert_eq!(sender.next_sequence_number(), seq(3));

        let stats = sender.stats();
        assert_eq!(stats.pkt_snd_buf, 2);
        assert_eq!(stats.byte_snd_buf, 200);
        assert_eq!(stats.pkt_sent, 0);
    }

    #[test]
    fn test_tick_sends_due_prefix_only() {
        let (sender, recorder, _) = sender(1_000);

        sender.push(packet(10, 100));
        sender.push(packet(11, 100));
        sender.push(packet(12, 100));

        sender.tick(9);
        assert!(recorder.take().is_empty());

        sender.tick(11);
        assert_eq!(recorder.take(), vec![(seq(1), false), (seq(2), false)]);

        let stats = sender.stats();
        assert_eq!(stats.pkt_sent, 2);
        assert_eq!(stats.pkt_sent_unique, 2);
        assert_eq!(stats.byte_sent_unique, 200);
        assert_eq!(stats.pkt_flight_size, 2);
        assert_eq!(stats.pkt_snd_buf, 3);
    }

    #[test]
    fn test_nak_retransmits_newest_first_and_keeps_packets() {
        let (sender, recorder, _) = sender(1_000);

        for deadline in 10..15 {
            sender.push(packet(deadline, 50));
        }
        sender.tick(14);
        recorder.take();

        sender.nak(&[seq(2), seq(3), seq(5), seq(5)]);
        assert_eq!(
            recorder.take(),
            vec![(seq(5), true), (seq(3), true), (seq(2), true)]
        );

        // Still retained, so a later NAK retransmits again
        sender.nak(&[seq(2), seq(2)]);
        assert_eq!(recorder.take(), vec![(seq(2), true)]);

        let stats = sender.stats();
        assert_eq!(stats.pkt_retrans, 4);
        assert_eq!(stats.pkt_snd_loss, 4);
        assert_eq!(stats.pkt_sent, 9);
        assert_eq!(stats.byte_retrans, 200);
    }

    #[test]
    fn test_overlapping_ranges_retransmit_once() {
        let (sender, recorder, _) = sender(1_000);

        sender.push(packet(10, 50));
        sender.tick(10);
        recorder.take();

        sender.nak(&[seq(1), seq(1), seq(0), seq(4)]);
        assert_eq!(recorder.take(), vec![(seq(1), true)]);
    }

    #[test]
    fn test_empty_or_unpaired_nak_is_noop() {
        let (sender, recorder, _) = sender(1_000);

        sender.push(packet(10, 50));
        sender.tick(10);
        recorder.take();

        sender.nak(&[]);
        sender.nak(&[seq(1)]);
        assert!(recorder.take().is_empty());
        assert_eq!(sender.stats().pkt_retrans, 0);
    }

    #[test]
    fn test_ack_removes_acknowledged_prefix() {
        let (sender, recorder, _) = sender(1_000);

        for deadline in [10, 11, 12] {
            sender.push(packet(deadline, 100));
        }
        sender.tick(12);
        recorder.take();

        sender.ack(seq(3));
        let stats = sender.stats();
        assert_eq!(stats.pkt_snd_buf, 1);
        assert_eq!(stats.byte_snd_buf, 100);
        assert_eq!(stats.pkt_flight_size, 1);

        // Acknowledged packets are no longer retransmittable
        sender.nak(&[seq(1), seq(3)]);
        assert_eq!(recorder.take(), vec![(seq(3), true)]);

        // A repeated ACK changes nothing
        sender.ack(seq(3));
        assert_eq!(sender.stats().pkt_snd_buf, 1);
    }

    #[test]
    fn test_drop_interval_purges_once() {
        let (sender, _, _) = sender(1_000);

        sender.push(packet(10, 100));
        sender.push(packet(500, 100));
        sender.tick(500);

        sender.tick(1_009);
        assert_eq!(sender.stats().pkt_snd_drop, 0);

        sender.tick(1_010);
        let stats = sender.stats();
        assert_eq!(stats.pkt_snd_drop, 1);
        assert_eq!(stats.pkt_snd_loss, 1);
        assert_eq!(stats.byte_snd_drop, 100);
        assert_eq!(stats.pkt_snd_buf, 1);

        sender.tick(1_200);
        assert_eq!(sender.stats().pkt_snd_drop, 1);

        // ACK for the purged packet must not underflow the gauges
        sender.ack(seq(2));
        sender.ack(seq(3));
        sender.ack(seq(3));
        let stats = sender.stats();
        assert_eq!(stats.pkt_snd_buf, 0);
        assert_eq!(stats.byte_snd_buf, 0);
    }

    #[test]
    fn test_ack_recomputes_pacing_from_payload_average() {
        let recorder = Recorder::default();
        let config = LiveSendConfig {
            max_bw: 1_000_000,
            ..LiveSendConfig::default()
        };
        let sender = LiveSender::new(config, Box::new(recorder)).unwrap();

        let before = sender.stats().us_pkt_snd_period;
        assert!((before - 1_472.0).abs() < 1e-9);

        for deadline in 0..64 {
            sender.push(packet(deadline, 184));
        }
        sender.tick(64);
        sender.ack(seq(64));

        let stats = sender.stats();
        assert!(stats.us_pkt_snd_period < before);
        assert!((stats.us_pkt_snd_period - (stats.byte_payload as f64 + 16.0)).abs() < 1.0);
        assert!(sender.send_period() < Duration::from_micros(1_472));
    }

    #[test]
    fn test_input_rate_estimate() {
        let (sender, _, clock) = sender(1_000);

        for i in 0..10 {
            sender.push(packet(i, 1_000));
        }
        clock.advance(1_000_000);
        sender.push(packet(10, 1_000));

        assert_eq!(sender.stats().estimated_input_bw, 11_000.0);
    }

    #[test]
    fn test_flush_clears_buffers() {
        let (sender, recorder, _) = sender(1_000);

        sender.push(packet(10, 100));
        sender.push(packet(20, 100));
        sender.tick(10);
        recorder.take();

        sender.flush();
        let stats = sender.stats();
        assert_eq!(stats.pkt_snd_buf, 0);
        assert_eq!(stats.pkt_flight_size, 0);
        assert_eq!(stats.pkt_sent, 1);

        sender.tick(100);
        sender.nak(&[seq(1), seq(2)]);
        assert!(recorder.take().is_empty());
    }
}
