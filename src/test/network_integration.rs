use crate::net::{DeviceId, LinkCostConfig, LinkId, LinkSpec, Network, PortId, RouterConfig};
use crate::proto::FlowSpec;
use crate::report::Report;
use crate::routing::BellmanFord;
use crate::sim::{Action, SimTime, Simulation};

fn spec(rate_bps: u64, delay_ms: u64, buffer_bytes: u64) -> LinkSpec {
    LinkSpec {
        rate_bps,
        delay: SimTime::from_millis(delay_ms),
        buffer_bytes,
    }
}

/// a ── 1Mbps/10ms ── b，a 上有一条发往 b 的流
fn build_two_hosts(bits: Option<u64>) -> (Network, DeviceId, DeviceId) {
    let mut net = Network::default();
    let a = net.add_host("a");
    let b = net.add_host("b");
    net.connect(a, b, spec(1_000_000, 10, 64_000)).expect("connect");
    net.add_flow(a, FlowSpec::new("a->b", b, bits, SimTime::ZERO))
        .expect("flow");
    (net, a, b)
}

fn port_of(net: &Network, dev: DeviceId) -> PortId {
    net.ports_of(dev)[0]
}

#[test]
fn two_packet_flow_is_delivered_and_acknowledged() {
    let (net, a, b) = build_two_hosts(Some(16_000));
    let mut sim = Simulation::new(net);
    sim.run();

    let net = sim.network();
    assert_eq!(net.stats.delivered_pkts, 2);
    assert_eq!(net.stats.delivered_bits, 16_000);
    assert_eq!(net.stats.acks_received, 2);
    assert_eq!(net.stats.dropped_pkts, 0);
    assert_eq!(net.stats.timeouts, 0);

    let flow = net.host(a).and_then(|h| h.flow(b)).expect("flow");
    assert!(flow.is_complete());
    assert_eq!(flow.unacked_count(), 0);
    assert_eq!(flow.remaining_bits(), Some(0));
    assert_eq!(flow.tracker.packets_acked(), 2);

    // 8ms 串行化 + 10ms 传播，ACK 512 bit 再加 0.512ms + 10ms
    let first_rtt = flow.tracker.rtt().samples()[0].1;
    assert!((first_rtt - 0.028_512).abs() < 1e-9, "rtt = {first_rtt}");
}

#[test]
fn full_incoming_buffer_drops_every_data_packet() {
    let (mut net, a, b) = build_two_hosts(Some(16_000));
    net.set_incoming_capacity(port_of(&net, b), 100);

    let mut sim = Simulation::new(net);
    sim.enable_trace();
    sim.run_until(SimTime::from_secs(1));

    let a_port = port_of(sim.network(), a);
    let trace = sim.trace.as_ref().expect("trace enabled");
    let sends = trace
        .events
        .iter()
        .filter(|e| e.port == a_port.0 && e.action == Action::Send)
        .count();
    assert!(sends > 0);
    assert!(trace.events.iter().all(|e| e.action != Action::Receive));

    let net = sim.network();
    assert_eq!(net.link(LinkId(0)).tracker.loss_count(), sends);
    assert_eq!(net.stats.dropped_pkts as usize, sends);
    assert_eq!(net.stats.delivered_pkts, 0);
    assert!(net.stats.timeouts >= 1);

    let flow = net.host(a).and_then(|h| h.flow(b)).expect("flow");
    assert!(!flow.is_complete());
    assert_eq!(flow.tracker.packets_acked(), 0);
}

#[test]
fn identical_runs_produce_identical_traces() {
    let run = || {
        let (net, _, _) = build_two_hosts(Some(400_000));
        let mut sim = Simulation::new(net);
        sim.enable_trace();
        sim.run();
        (sim.trace.take().expect("trace"), sim.network().stats.clone())
    };

    let (t1, s1) = run();
    let (t2, s2) = run();
    assert_eq!(t1, t2);
    assert_eq!(s1, s2);
}

#[test]
fn buffers_never_exceed_capacity() {
    // 小缓冲 + 无限流，持续制造拥塞
    let mut net = Network::default();
    let a = net.add_host("a");
    let b = net.add_host("b");
    net.connect(a, b, spec(1_000_000, 5, 4_000)).expect("connect");
    net.add_flow(a, FlowSpec::new("a->b", b, None, SimTime::ZERO))
        .expect("flow");

    let mut sim = Simulation::new(net);
    let mut horizon = SimTime::ZERO;
    while horizon < SimTime::from_secs(2) {
        horizon = horizon.saturating_add(SimTime::from_millis(1));
        sim.run_until(horizon);

        let net = sim.network();
        for i in 0..net.port_count() {
            let p = net.port(PortId(i));
            assert!(p.outgoing.bytes() <= p.outgoing.capacity_bytes());
            assert!(p.incoming.bytes() <= p.incoming.capacity_bytes());
        }
    }

    let net = sim.network();
    assert!(net.stats.delivered_pkts > 0);
    assert!(net.stats.dropped_pkts > 0, "4000B buffer should overflow");
}

#[test]
fn router_forwards_between_hosts() {
    let mut net = Network::default();
    net.set_link_cost_config(LinkCostConfig::static_only());
    let h1 = net.add_host("h1");
    let h2 = net.add_host("h2");
    let r = net.add_router("r", Box::new(BellmanFord::default()), RouterConfig::default());
    net.connect(h1, r, spec(10_000_000, 1, 64_000)).expect("h1-r");
    net.connect(r, h2, spec(10_000_000, 1, 64_000)).expect("r-h2");
    net.add_flow(h1, FlowSpec::new("h1->h2", h2, Some(24_000), SimTime::ZERO))
        .expect("flow");

    let mut sim = Simulation::new(net);
    sim.run();

    let net = sim.network();
    assert_eq!(net.stats.delivered_pkts, 3);
    assert_eq!(net.stats.acks_received, 3);
    assert_eq!(net.stats.unroutable_pkts, 0);
    // 单路由器没有路由器邻居，不会发通告
    assert_eq!(net.stats.advertisements, 0);

    let flow = net.host(h1).and_then(|h| h.flow(h2)).expect("flow");
    assert!(flow.is_complete());

    let router = net.router(r).expect("router");
    assert!(router.next(h1).is_some());
    assert!(router.next(h2).is_some());
}

#[test]
fn report_collects_flows_links_and_names() {
    let (net, _, _) = build_two_hosts(Some(16_000));
    let mut sim = Simulation::new(net);
    sim.run();

    let mut report = Report::build(&sim, SimTime::from_millis(10));
    assert_eq!(report.end_ns, sim.now().0);
    assert_eq!(report.devices.len(), 2);
    assert_eq!(report.links.len(), 2);
    assert!(report.routing.is_empty());

    let names = [("ab".to_string(), LinkId(0))];
    report.name_links(names.iter().map(|(n, id)| (n, id)));
    let ab = report.link("ab").expect("named link");
    assert_eq!((ab.from.as_str(), ab.to.as_str()), ("a", "b"));
    assert_eq!(ab.packets_sent, 2);
    assert_eq!(ab.bits_sent, 16_000);
    assert!(ab.losses.is_empty());
    assert!(report.links[1].name.is_none());

    let f = report.flow("a->b").expect("flow report");
    assert!(f.complete);
    assert_eq!(f.algorithm, "aimd");
    assert_eq!(f.bits_acked, 16_000);
    assert_eq!(f.rtt_series.len(), 2);

    report.retain_measured(&["a->b".to_string()], &[]);
    assert_eq!(report.flows.len(), 1);
    assert!(report.links.is_empty());
}

#[test]
fn retransmitted_copies_are_counted_once() {
    // 回程缓冲放不下 ACK：数据包每次都送达，但源端只能靠超时重传
    let (mut net, a, b) = build_two_hosts(Some(8_000));
    net.set_incoming_capacity(port_of(&net, a), 10);

    let mut sim = Simulation::new(net);
    sim.run_until(SimTime::from_secs(1));

    let net = sim.network();
    assert!(net.stats.timeouts >= 1);
    assert_eq!(net.stats.delivered_pkts, 1);
    assert_eq!(net.stats.delivered_bits, 8_000);
    assert!(net.stats.duplicate_pkts >= 1);
    assert_eq!(net.stats.acks_received, 0);

    let flow = net.host(a).and_then(|h| h.flow(b)).expect("flow");
    assert!(!flow.is_complete());
}
