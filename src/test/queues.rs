use crate::net::{ACK_PACKET_BITS, DeviceId, Packet};
use crate::queue::Buffer;
use crate::sim::SimTime;

fn pkt(seq: u64, bits: u64) -> Packet {
    let mut p = Packet::new(DeviceId(0), DeviceId(1), bits);
    p.seq = seq;
    p
}

#[test]
fn buffer_is_fifo_and_tracks_bytes() {
    let mut b = Buffer::new(3_000);
    b.push(pkt(1, 8_000), SimTime(1)).expect("fits");
    b.push(pkt(2, 8_000), SimTime(2)).expect("fits");
    assert_eq!(b.len(), 2);
    assert_eq!(b.bytes(), 2_000);
    assert_eq!(b.peek().map(|p| p.seq), Some(1));

    let first = b.pop().expect("head");
    assert_eq!(first.packet.seq, 1);
    assert_eq!(first.since, SimTime(1));
    assert_eq!(b.bytes(), 1_000);
    assert_eq!(b.pop().map(|q| q.packet.seq), Some(2));
    assert!(b.is_empty());
    assert_eq!(b.bytes(), 0);
}

#[test]
fn buffer_rejects_when_full_and_returns_packet() {
    let mut b = Buffer::new(1_500);
    b.push(pkt(1, 8_000), SimTime::ZERO).expect("fits");
    let rejected = b.push(pkt(2, 8_000), SimTime::ZERO).expect_err("over capacity");
    assert_eq!(rejected.seq, 2);
    assert_eq!(b.len(), 1);
    assert!(b.bytes() <= b.capacity_bytes());

    // 小包仍然可以放进剩余空间
    assert!(b.push(pkt(3, ACK_PACKET_BITS), SimTime::ZERO).is_ok());
    assert_eq!(b.bytes(), 1_064);
}

#[test]
fn buffer_smaller_than_packet_always_rejects() {
    let mut b = Buffer::new(999);
    for seq in 0..5 {
        assert!(b.push(pkt(seq, 8_000), SimTime::ZERO).is_err());
    }
    assert!(b.is_empty());
}

#[test]
fn buffer_capacity_never_drops_below_occupancy() {
    let mut b = Buffer::new(4_000);
    b.push(pkt(1, 16_000), SimTime::ZERO).expect("fits");
    b.set_capacity_bytes(100);
    assert_eq!(b.capacity_bytes(), 2_000);
    b.set_capacity_bytes(10_000);
    assert_eq!(b.capacity_bytes(), 10_000);
}
