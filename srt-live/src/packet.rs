//! Live data packets
//!
//! The controllers never see wire bytes: packets arrive already decoded and
//! leave the same way. This module only models what the live algorithm reads
//! and writes: the sequence number, the timing fields used for
//! time-stamp-based packet delivery (TSBPD), the retransmission flag and the
//! payload length.

use crate::sequence::SeqNumber;
use bytes::Bytes;
use std::fmt;

/// Size of the SRT packet header in bytes (4 fields × 4 bytes each)
///
/// Used as the per-packet overhead in the pacing formula.
pub const HEADER_SIZE: usize = 16;

/// Maximum payload size for SRT packet (MTU 1500 - IP/UDP headers - SRT header)
pub const MAX_PAYLOAD_SIZE: usize = 1456;

/// Maximum on-wire timestamp value (32-bit)
pub const MAX_TIMESTAMP: u32 = 0xFFFF_FFFF;

/// Header fields of a live data packet
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PacketHeader {
    /// Packet sequence number, assigned by the sending controller
    pub seq: SeqNumber,
    /// Message number (26 bits on the wire)
    pub msg_number: u32,
    /// On-wire timestamp: the delivery deadline truncated to 32 bits
    pub timestamp: u32,
    /// Time the payload was generated (microseconds)
    pub origin_time: u64,
    /// Delivery deadline (microseconds)
    pub tsbpd_time: u64,
    /// Set on every retransmission of the packet
    pub retransmitted: bool,
}

/// Data packet
#[derive(Clone, PartialEq, Eq)]
pub struct DataPacket {
    pub header: PacketHeader,
    pub payload: Bytes,
}

impl DataPacket {
    /// Create a packet that has not been sequenced yet
    ///
    /// The sender controller assigns the sequence number and on-wire
    /// timestamp on push.
    pub fn new(origin_time: u64, tsbpd_time: u64, payload: Bytes) -> Self {
        DataPacket {
            header: PacketHeader {
                origin_time,
                tsbpd_time,
                ..PacketHeader::default()
            },
            payload,
        }
    }

    /// Create a packet as it comes out of the decoder on the receiving side
    pub fn received(seq: SeqNumber, tsbpd_time: u64, retransmitted: bool, payload: Bytes) -> Self {
        DataPacket {
            header: PacketHeader {
                seq,
                timestamp: truncate_timestamp(tsbpd_time),
                tsbpd_time,
                retransmitted,
                ..PacketHeader::default()
            },
            payload,
        }
    }

    #[inline]
    pub fn seq_number(&self) -> SeqNumber {
        self.header.seq
    }

    #[inline]
    pub fn tsbpd_time(&self) -> u64 {
        self.header.tsbpd_time
    }

    #[inline]
    pub fn is_retransmitted(&self) -> bool {
        self.header.retransmitted
    }

    /// Payload length in bytes
    #[inline]
    pub fn len(&self) -> u64 {
        self.payload.len() as u64
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Release the packet for good
    ///
    /// Consumes the packet; the payload buffer is returned to the allocator
    /// (or to whoever else still shares the `Bytes`).
    pub fn decommission(self) {
        tracing::trace!(seq = %self.header.seq, len = self.payload.len(), "packet decommissioned");
    }
}

impl fmt::Debug for DataPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataPacket")
            .field("seq", &self.header.seq)
            .field("tsbpd_time", &self.header.tsbpd_time)
            .field("retransmitted", &self.header.retransmitted)
            .field("len", &self.payload.len())
            .finish()
    }
}

/// Truncate a microsecond deadline to the 32-bit on-wire timestamp field
#[inline]
pub fn truncate_timestamp(time_us: u64) -> u32 {
    (time_us & MAX_TIMESTAMP as u64) as u32
}
