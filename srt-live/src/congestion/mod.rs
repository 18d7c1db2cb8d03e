//! Live congestion control (LiveCC)
//!
//! SRT's default live-mode algorithm: no congestion window and no back-off.
//! The sender paces at a period derived from the average payload size and a
//! bandwidth ceiling, holds every sent packet until it is acknowledged or
//! too old to matter, and retransmits on loss reports. The receiver reorders,
//! reports gaps and hands packets to the application once they are
//! acknowledged and their delivery deadline has passed.
//!
//! Both controllers are passive. Callers drive them with `tick(now)` from a
//! periodic timer and with protocol events from the network path. Results
//! come out through the [`SenderEvents`] / [`ReceiverEvents`] sinks, which
//! are called synchronously while the controller's lock is held: a sink must
//! not call back into the same controller (queue the work instead).

mod receiver;
mod sender;

pub use receiver::LiveReceiver;
pub use sender::LiveSender;

use crate::packet::{DataPacket, HEADER_SIZE};
use crate::sequence::SeqNumber;
use std::collections::VecDeque;

/// Output of the sending controller
pub trait SenderEvents: Send + Sync {
    /// A packet is due on the wire, either for the first time or as a
    /// retransmission (`packet.header.retransmitted`)
    ///
    /// The sender keeps the packet for possible retransmission, so only a
    /// reference is handed out.
    fn on_deliver(&mut self, _packet: &DataPacket) {}
}

/// Output of the receiving controller
pub trait ReceiverEvents: Send + Sync {
    /// Acknowledge every packet before `seq`
    fn on_send_ack(&mut self, _seq: SeqNumber, _lite: bool) {}

    /// Report `from..=to` as lost
    fn on_send_nak(&mut self, _from: SeqNumber, _to: SeqNumber) {}

    /// Hand a packet to the application, in sequence order
    fn on_deliver(&mut self, packet: DataPacket) {
        packet.decommission();
    }
}

/// Event sink that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEvents;

impl SenderEvents for NoopEvents {}

impl ReceiverEvents for NoopEvents {}

/// Inter-packet sending period in microseconds
pub fn pacing_period_us(avg_payload_size: f64, max_bw: f64) -> f64 {
    (avg_payload_size + HEADER_SIZE as f64) * 1_000_000.0 / max_bw
}

fn pop_front_if<F>(queue: &mut VecDeque<DataPacket>, ready: F) -> Option<DataPacket>
where
    F: Fn(&DataPacket) -> bool,
{
    if queue.front().map_or(false, ready) {
        queue.pop_front()
    } else {
        None
    }
}
