//! Live congestion control statistics
//!
//! Counters only ever grow; the "instantaneous" gauges follow buffer
//! occupancy and are updated with saturating arithmetic so that a double
//! removal can never wrap them around.

/// Sender statistics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SendStats {
    /// Packets handed to the network, retransmissions included
    pub pkt_sent: u64,
    pub byte_sent: u64,

    /// Packets handed to the network for the first time
    pub pkt_sent_unique: u64,
    pub byte_sent_unique: u64,

    /// Packets reported lost by the peer or expired unacknowledged
    pub pkt_snd_loss: u64,
    pub byte_snd_loss: u64,

    pub pkt_retrans: u64,
    pub byte_retrans: u64,

    /// Time spent sending (µs); not measured by the live algorithm
    pub us_snd_duration: u64,

    /// Packets purged from the loss list after the drop interval
    pub pkt_snd_drop: u64,
    pub byte_snd_drop: u64,

    // instantaneous
    /// Packets held by the sender (send buffer plus loss list)
    pub pkt_snd_buf: u64,
    pub byte_snd_buf: u64,
    /// Packets sent but neither acknowledged nor dropped
    pub pkt_flight_size: u64,
    /// Pacing period (µs)
    pub us_pkt_snd_period: f64,
    /// Average payload size (bytes)
    pub byte_payload: u64,
    /// Measured application input rate (bytes/s)
    pub estimated_input_bw: f64,
}

/// Receiver statistics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecvStats {
    /// Every packet pushed into the receiver
    pub pkt_recv: u64,
    pub byte_recv: u64,

    /// Packets accepted into the reorder buffer
    pub pkt_recv_unique: u64,
    pub byte_recv_unique: u64,

    /// Sequence numbers detected missing (bytes estimated)
    pub pkt_rcv_loss: u64,
    pub byte_rcv_loss: u64,

    /// Retransmitted packets that filled a gap
    pub pkt_rcv_retrans: u64,
    pub byte_rcv_retrans: u64,

    /// Late or duplicate packets discarded
    pub pkt_rcv_drop: u64,
    pub byte_rcv_drop: u64,

    // instantaneous
    pub pkt_rcv_buf: u64,
    pub byte_rcv_buf: u64,
    /// Average payload size (bytes)
    pub byte_payload: u64,
}

/// Exponential moving average of the payload size (SRT LiveCC, 7/8 weight)
#[inline]
pub fn update_avg_payload(avg: f64, len: u64) -> f64 {
    0.875 * avg + 0.125 * len as f64
}

/// Rolling packet/byte rate over a fixed window
#[derive(Debug, Clone)]
pub struct RateWindow {
    period_us: u64,
    last_us: u64,
    packets: u64,
    bytes: u64,
    prev_packets: u64,
    prev_bytes: u64,
    pps: f64,
    bps: f64,
}

/// Window length of the rate estimates
pub const RATE_PERIOD_US: u64 = 1_000_000;

impl RateWindow {
    pub fn new(period_us: u64, now_us: u64) -> Self {
        RateWindow {
            period_us,
            last_us: now_us,
            packets: 0,
            bytes: 0,
            prev_packets: 0,
            prev_bytes: 0,
            pps: 0.0,
            bps: 0.0,
        }
    }

    pub fn record(&mut self, bytes: u64) {
        self.packets += 1;
        self.bytes += bytes;
    }

    /// Whether a full window has passed since the last refresh
    pub fn is_due(&self, now_us: u64) -> bool {
        now_us.saturating_sub(self.last_us) >= self.period_us
    }

    /// Recompute the rates over the time since the last refresh
    pub fn refresh(&mut self, now_us: u64) {
        let elapsed_us = now_us.saturating_sub(self.last_us);
        if elapsed_us == 0 {
            return;
        }

        let seconds = elapsed_us as f64 / 1_000_000.0;
        self.pps = (self.packets - self.prev_packets) as f64 / seconds;
        self.bps = (self.bytes - self.prev_bytes) as f64 / seconds;

        self.prev_packets = self.packets;
        self.prev_bytes = self.bytes;
        self.last_us = now_us;
    }

    pub fn packets_per_sec(&self) -> f64 {
        self.pps
    }

    pub fn bytes_per_sec(&self) -> f64 {
        self.bps
    }
}
