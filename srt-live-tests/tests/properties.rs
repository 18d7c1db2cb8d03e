//! Property-based tests for sequence arithmetic and delivery ordering
//!
//! These tests use proptest to generate sequence numbers around the wrap
//! boundary and arbitrary arrival orders, and check that the receiver always
//! hands packets to the application in sequence order.

use bytes::Bytes;
use parking_lot::Mutex;
use proptest::prelude::*;
use srt_live::sequence::MAX_SEQ_NUMBER;
use srt_live::{
    DataPacket, LiveRecvConfig, LiveReceiver, LiveSendConfig, LiveSender, ManualClock,
    ReceiverEvents, SenderEvents, SeqNumber,
};
use std::sync::Arc;

// Property test strategies

fn seq_number_strategy() -> impl Strategy<Value = SeqNumber> {
    prop_oneof![
        (MAX_SEQ_NUMBER - 300..=MAX_SEQ_NUMBER),
        (0..=MAX_SEQ_NUMBER),
    ]
    .prop_map(SeqNumber::new_unchecked)
}

/// Offsets `0..n` in arbitrary order
fn arrival_order_strategy() -> impl Strategy<Value = Vec<u32>> {
    (1u32..200).prop_flat_map(|n| Just((0..n).collect::<Vec<_>>()).prop_shuffle())
}

/// A subset of offsets `0..n` in arbitrary order
fn lossy_arrival_strategy() -> impl Strategy<Value = Vec<u32>> {
    prop::collection::vec(any::<bool>(), 1..150).prop_flat_map(|keep| {
        let kept: Vec<u32> = keep
            .iter()
            .enumerate()
            .filter(|(_, kept)| **kept)
            .map(|(i, _)| i as u32)
            .collect();
        Just(kept).prop_shuffle()
    })
}

#[derive(Clone, Default)]
struct Delivered {
    seqs: Arc<Mutex<Vec<SeqNumber>>>,
}

impl ReceiverEvents for Delivered {
    fn on_deliver(&mut self, packet: DataPacket) {
        self.seqs.lock().push(packet.seq_number());
    }
}

impl SenderEvents for Delivered {
    fn on_deliver(&mut self, packet: &DataPacket) {
        self.seqs.lock().push(packet.seq_number());
    }
}

fn receiver(initial: SeqNumber) -> (LiveReceiver, Delivered) {
    let delivered = Delivered::default();
    let config = LiveRecvConfig {
        initial_sequence_number: initial.as_raw(),
        periodic_ack_interval_us: 100,
        ..LiveRecvConfig::default()
    };
    let receiver = LiveReceiver::with_clock(
        config,
        Box::new(delivered.clone()),
        Arc::new(ManualClock::new(0)),
    )
    .unwrap();
    (receiver, delivered)
}

fn packet(seq: SeqNumber) -> DataPacket {
    DataPacket::received(seq, 1_000, false, Bytes::from_static(&[0u8; 64]))
}

proptest! {
    #[test]
    fn prop_successor_is_greater(a in seq_number_strategy()) {
        let b = a.next();

        prop_assert!(a.lt(b));
        prop_assert!(!b.lt(a));
        prop_assert!(b.gt(a));
        prop_assert_eq!(a.distance_to(b), 1);
        prop_assert_eq!(b.prev(), a);
    }

    #[test]
    fn prop_distance_matches_offset(
        a in seq_number_strategy(),
        offset in 1u32..(1 << 30),
    ) {
        let b = a + offset;

        prop_assert_eq!(a.distance_to(b), offset as i32);
        prop_assert_eq!(b.distance_to(a), -(offset as i32));
        prop_assert!(a.lt(b));
        prop_assert_eq!(b - a, offset as i32);
    }

    #[test]
    fn prop_receiver_delivers_in_order(
        initial in seq_number_strategy(),
        order in arrival_order_strategy(),
    ) {
        let (receiver, delivered) = receiver(initial);

        for offset in &order {
            receiver.push(packet(initial + *offset));
        }

        for now in [100, 1_100, 1_200] {
            receiver.tick(now);
        }

        let expected: Vec<SeqNumber> = (0..order.len() as u32).map(|i| initial + i).collect();
        prop_assert_eq!(&*delivered.seqs.lock(), &expected);
        prop_assert_eq!(receiver.stats().pkt_recv_unique, order.len() as u64);
        prop_assert_eq!(receiver.stats().pkt_rcv_buf, 0);
    }

    #[test]
    fn prop_receiver_skips_losses_in_order(
        initial in seq_number_strategy(),
        order in lossy_arrival_strategy(),
    ) {
        let (receiver, delivered) = receiver(initial);

        for offset in &order {
            receiver.push(packet(initial + *offset));
        }

        // One ACK round per gap at most
        let mut now = 100;
        for _ in 0..order.len() + 160 {
            receiver.tick(now);
            now += 100;
        }

        let mut expected: Vec<u32> = order.clone();
        expected.sort_unstable();
        let expected: Vec<SeqNumber> = expected.into_iter().map(|i| initial + i).collect();

        let delivered = delivered.seqs.lock();
        prop_assert_eq!(&*delivered, &expected);
        prop_assert!(delivered.windows(2).all(|w| w[0].lt(w[1])));
    }

    #[test]
    fn prop_sender_sends_each_packet_once(
        initial in seq_number_strategy(),
        deadlines in prop::collection::vec(0u64..10_000, 1..100),
        tick_step in 1u64..500,
    ) {
        let mut deadlines = deadlines;
        deadlines.sort_unstable();

        let sent = Delivered::default();
        let config = LiveSendConfig {
            initial_sequence_number: initial.as_raw(),
            ..LiveSendConfig::default()
        };
        let sender = LiveSender::with_clock(
            config,
            Box::new(sent.clone()),
            Arc::new(ManualClock::new(0)),
        )
        .unwrap();

        for deadline in &deadlines {
            sender.push(DataPacket::new(*deadline, *deadline, Bytes::from_static(b"ts")));
        }

        let mut now = 0;
        while now <= 10_000 + tick_step {
            sender.tick(now);
            now += tick_step;
        }

        let expected: Vec<SeqNumber> = (0..deadlines.len() as u32).map(|i| initial + i).collect();
        prop_assert_eq!(&*sent.seqs.lock(), &expected);
        prop_assert_eq!(sender.stats().pkt_sent, deadlines.len() as u64);
        prop_assert_eq!(sender.stats().pkt_retrans, 0);
    }
}
