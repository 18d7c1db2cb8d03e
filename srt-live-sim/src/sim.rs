//! Sender and receiver wired back to back over simulated links
//!
//! Everything runs on one thread against a [`ManualClock`]. The controllers'
//! event sinks only queue their output; the run loop moves it across the
//! links and feeds ACKs and NAKs back into the sender.

use crate::config::{ConfigError, SimConfig};
use crate::link::LossyLink;
use bytes::Bytes;
use parking_lot::Mutex;
use srt_live::{
    Clock, DataPacket, LiveReceiver, LiveSender, ManualClock, ReceiverEvents, RecvStats,
    SendStats, SenderEvents, SeqNumber,
};
use std::sync::Arc;
use std::time::Duration;

/// Control traffic from receiver to sender
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Ack(SeqNumber),
    Nak(SeqNumber, SeqNumber),
}

/// What reached the application on the receiving side
#[derive(Debug, Default)]
struct DeliveryLog {
    packets: u64,
    bytes: u64,
    last: Option<SeqNumber>,
    out_of_order: u64,
    early: u64,
}

struct WireSink {
    wire: Arc<Mutex<Vec<DataPacket>>>,
}

impl SenderEvents for WireSink {
    fn on_deliver(&mut self, packet: &DataPacket) {
        self.wire.lock().push(packet.clone());
    }
}

struct ControlSink {
    control: Arc<Mutex<Vec<Control>>>,
    delivered: Arc<Mutex<DeliveryLog>>,
    clock: ManualClock,
}

impl ReceiverEvents for ControlSink {
    fn on_send_ack(&mut self, seq: SeqNumber, _lite: bool) {
        self.control.lock().push(Control::Ack(seq));
    }

    fn on_send_nak(&mut self, from: SeqNumber, to: SeqNumber) {
        self.control.lock().push(Control::Nak(from, to));
    }

    fn on_deliver(&mut self, packet: DataPacket) {
        let mut log = self.delivered.lock();
        let seq = packet.seq_number();

        if log.last.map_or(false, |last| !last.lt(seq)) {
            tracing::warn!(seq = %seq, "packet delivered out of order");
            log.out_of_order += 1;
        }
        if self.clock.now_us() < packet.tsbpd_time() {
            tracing::warn!(seq = %seq, "packet delivered before its deadline");
            log.early += 1;
        }

        log.packets += 1;
        log.bytes += packet.len();
        log.last = Some(seq);
        packet.decommission();
    }
}

/// Outcome of a simulation run
#[derive(Debug, Clone, PartialEq)]
pub struct SimReport {
    pub pushed: u64,
    pub delivered: u64,
    pub delivered_bytes: u64,
    /// Deliveries that did not advance the sequence number
    pub out_of_order: u64,
    /// Deliveries that happened before the packet's deadline
    pub early: u64,
    pub link_dropped: u64,
    pub link_duplicated: u64,
    pub duration: Duration,
    pub sender: SendStats,
    pub receiver: RecvStats,
}

impl SimReport {
    /// Fraction of pushed packets that reached the application
    pub fn delivery_ratio(&self) -> f64 {
        if self.pushed == 0 {
            1.0
        } else {
            self.delivered as f64 / self.pushed as f64
        }
    }
}

pub struct Simulation {
    config: SimConfig,
    clock: ManualClock,
    sender: LiveSender,
    receiver: LiveReceiver,
    wire: Arc<Mutex<Vec<DataPacket>>>,
    control: Arc<Mutex<Vec<Control>>>,
    delivered: Arc<Mutex<DeliveryLog>>,
    data_link: LossyLink<DataPacket>,
    control_link: LossyLink<Control>,
}

impl Simulation {
    pub fn new(config: SimConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let clock = ManualClock::new(0);
        let wire = Arc::new(Mutex::new(Vec::new()));
        let control = Arc::new(Mutex::new(Vec::new()));
        let delivered = Arc::new(Mutex::new(DeliveryLog::default()));

        let sender = LiveSender::with_clock(
            config.sender.clone(),
            Box::new(WireSink { wire: wire.clone() }),
            Arc::new(clock.clone()),
        )?;
        let receiver = LiveReceiver::with_clock(
            config.receiver.clone(),
            Box::new(ControlSink {
                control: control.clone(),
                delivered: delivered.clone(),
                clock: clock.clone(),
            }),
            Arc::new(clock.clone()),
        )?;

        let data_link = LossyLink::new(&config.link);
        let control_link = LossyLink::lossless(config.link.latency_us);

        Ok(Simulation {
            config,
            clock,
            sender,
            receiver,
            wire,
            control,
            delivered,
            data_link,
            control_link,
        })
    }

    /// Run to completion without progress reports
    pub fn run(self) -> SimReport {
        self.run_with(|_, _, _| {})
    }

    /// Run to completion, calling `progress` once per statistics interval
    /// of simulated time
    pub fn run_with<F>(mut self, mut progress: F) -> SimReport
    where
        F: FnMut(Duration, &SendStats, &RecvStats),
    {
        let run = self.config.run.clone();
        let payload = Bytes::from(vec![0u8; run.payload_size]);
        let stats_interval_us = (run.stats_interval().as_micros() as u64).max(run.tick_interval_us);

        let end_us = self.drain_deadline();
        let mut now = 0u64;
        let mut next_push = 0u64;
        let mut next_stats = stats_interval_us;
        let mut pushed = 0u64;

        tracing::info!(
            packets = run.packets,
            loss_rate = self.config.link.loss_rate,
            latency_us = run.latency_us,
            "simulation starting"
        );

        while now <= end_us {
            self.clock.set(now);

            while pushed < run.packets && next_push <= now {
                // The sender's deadline is the send time; the receiver's is
                // that plus the TSBPD latency.
                self.sender
                    .push(DataPacket::new(next_push, next_push, payload.clone()));
                pushed += 1;
                next_push += run.packet_interval_us;
            }

            self.sender.tick(now);
            let outgoing = std::mem::take(&mut *self.wire.lock());
            for packet in outgoing {
                self.data_link.send(now, packet);
            }

            for packet in self.data_link.receive(now) {
                self.receiver.push(DataPacket::received(
                    packet.seq_number(),
                    packet.tsbpd_time() + run.latency_us,
                    packet.is_retransmitted(),
                    packet.payload,
                ));
            }

            self.receiver.tick(now);
            let feedback = std::mem::take(&mut *self.control.lock());
            for message in feedback {
                self.control_link.send(now, message);
            }

            for message in self.control_link.receive(now) {
                match message {
                    Control::Ack(seq) => self.sender.ack(seq),
                    Control::Nak(from, to) => self.sender.nak(&[from, to]),
                }
            }

            if now >= next_stats {
                progress(
                    Duration::from_micros(now),
                    &self.sender.stats(),
                    &self.receiver.stats(),
                );
                next_stats += stats_interval_us;
            }

            now += run.tick_interval_us;
        }

        let log = self.delivered.lock();
        let report = SimReport {
            pushed,
            delivered: log.packets,
            delivered_bytes: log.bytes,
            out_of_order: log.out_of_order,
            early: log.early,
            link_dropped: self.data_link.dropped(),
            link_duplicated: self.data_link.duplicated(),
            duration: Duration::from_micros(now),
            sender: self.sender.stats(),
            receiver: self.receiver.stats(),
        };

        tracing::info!(
            delivered = report.delivered,
            pushed = report.pushed,
            retransmitted = report.sender.pkt_retrans,
            "simulation finished"
        );

        report
    }

    /// Time by which every packet has either been delivered or given up on
    fn drain_deadline(&self) -> u64 {
        let run = &self.config.run;
        let last_push = run.packets.saturating_sub(1) * run.packet_interval_us;

        last_push
            + run.latency_us
            + 2 * self.config.link.latency_us
            + 2 * self.config.receiver.periodic_ack_interval_us
            + 2 * run.tick_interval_us
    }
}
