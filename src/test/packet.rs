use std::collections::BTreeMap;

use crate::net::{ACK_PACKET_BITS, DATA_PACKET_BITS, DataKey, Datum, DeviceId, Packet};
use crate::sim::SimTime;

#[test]
fn data_packet_defaults() {
    let p = Packet::data_packet(DeviceId(3), DeviceId(7));
    assert_eq!(p.source, DeviceId(3));
    assert_eq!(p.dest, DeviceId(7));
    assert_eq!(p.size_bits, DATA_PACKET_BITS);
    assert_eq!(p.size_bytes(), 1_000);
    assert!(!p.is_ack());
    assert_eq!(p.protocol(), None);
    assert_eq!(p.costs(), None);
}

#[test]
fn ack_swaps_addresses_and_keeps_seq_and_creation_time() {
    let mut p = Packet::data_packet(DeviceId(1), DeviceId(2));
    p.seq = 42;
    p.created_at = SimTime::from_millis(5);

    let ack = p.ack_for();
    assert!(ack.is_ack());
    assert_eq!(ack.source, DeviceId(2));
    assert_eq!(ack.dest, DeviceId(1));
    assert_eq!(ack.seq, 42);
    assert_eq!(ack.created_at, SimTime::from_millis(5));
    assert_eq!(ack.size_bits, ACK_PACKET_BITS);
    assert_eq!(ack.size_bytes(), 64);
}

#[test]
fn size_bytes_rounds_up() {
    assert_eq!(Packet::new(DeviceId(0), DeviceId(1), 1).size_bytes(), 1);
    assert_eq!(Packet::new(DeviceId(0), DeviceId(1), 9).size_bytes(), 2);
    assert_eq!(Packet::new(DeviceId(0), DeviceId(1), 0).size_bytes(), 0);
}

#[test]
fn annotations_round_trip_through_typed_accessors() {
    let mut p = Packet::data_packet(DeviceId(0), DeviceId(1));
    let costs: BTreeMap<_, _> = [(DeviceId(4), 0.5)].into_iter().collect();
    p.set_datum(DataKey::Costs, Datum::Costs(costs.clone()));
    p.set_datum(DataKey::Protocol, Datum::Protocol("bellman-ford"));

    assert!(p.has_datum(DataKey::Costs));
    assert_eq!(p.costs(), Some(&costs));
    assert_eq!(p.protocol(), Some("bellman-ford"));
    assert!(!p.is_ack());
}
