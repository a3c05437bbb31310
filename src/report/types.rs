use std::collections::BTreeMap;

use serde::Serialize;

use crate::net::{DeviceKind, LinkId, Network, Stats};
use crate::proto::{CongestionState, Flow};
use crate::sim::{SimTime, Simulation};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceInfo {
    pub id: usize,
    pub name: String,
    pub kind: DeviceKind,
}

/// 单向链路的统计
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkReport {
    pub id: usize,
    /// 配置文件中的连接名（只有 src→dst 方向有名字）
    pub name: Option<String>,
    pub from: String,
    pub to: String,
    pub rate_bps: u64,
    pub delay_ns: u64,
    pub packets_sent: usize,
    pub bits_sent: u64,
    /// 丢包时刻（秒）
    pub losses: Vec<f64>,
    pub mean_throughput_bps: f64,
    /// `(桶起点秒, bit/s)`
    pub throughput: Vec<(f64, f64)>,
    /// `(秒, 出口缓冲区字节数)`
    pub occupancy: Vec<(f64, f64)>,
    /// `(秒, RTT 秒)`，按 ACK 回到发送端的时刻
    pub rtt_series: Vec<(f64, f64)>,
}

/// 主机流的统计
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowReport {
    pub name: String,
    pub source: String,
    pub dest: String,
    pub algorithm: &'static str,
    pub state: CongestionState,
    pub window: f64,
    pub ssthresh: f64,
    pub total_bits: Option<u64>,
    pub remaining_bits: Option<u64>,
    pub unacked: usize,
    pub complete: bool,
    pub packets_sent: usize,
    pub packets_acked: usize,
    pub bits_acked: u64,
    pub timeouts: usize,
    pub fast_recoveries: usize,
    pub window_series: Vec<(f64, f64)>,
    pub rtt_series: Vec<(f64, f64)>,
    pub throughput: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteEntry {
    pub dest: String,
    pub next_hop: String,
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutingReport {
    pub router: String,
    pub routes: Vec<RouteEntry>,
}

/// 一次运行的完整报告
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub end_ns: u64,
    pub processed_events: u64,
    pub stats: Stats,
    pub devices: Vec<DeviceInfo>,
    pub flows: Vec<FlowReport>,
    pub links: Vec<LinkReport>,
    pub routing: Vec<RoutingReport>,
}

fn flow_report(net: &Network, source: &str, flow: &Flow, bin: SimTime) -> FlowReport {
    FlowReport {
        name: flow.name().to_string(),
        source: source.to_string(),
        dest: net.name(flow.dest()).to_string(),
        algorithm: flow.algorithm().name(),
        state: flow.state(),
        window: flow.window(),
        ssthresh: flow.ssthresh(),
        total_bits: flow.total_bits(),
        remaining_bits: flow.remaining_bits(),
        unacked: flow.unacked_count(),
        complete: flow.is_complete(),
        packets_sent: flow.tracker.packets_sent(),
        packets_acked: flow.tracker.packets_acked(),
        bits_acked: flow.tracker.bits_acked(),
        timeouts: flow.tracker.timeouts(),
        fast_recoveries: flow.tracker.fast_recoveries(),
        window_series: flow.tracker.window_series(),
        rtt_series: flow.tracker.rtt_series(),
        throughput: flow.tracker.throughput_series(bin),
    }
}

impl Report {
    /// 从仿真当前状态生成报告；`bin` 是吞吐量序列的分桶宽度。
    pub fn build(sim: &Simulation, bin: SimTime) -> Self {
        let net = sim.network();
        let end = sim.now();

        let devices = net
            .device_ids()
            .map(|id| DeviceInfo {
                id: id.0,
                name: net.name(id).to_string(),
                kind: net.kind(id),
            })
            .collect();

        let mut flows = Vec::new();
        let mut routing = Vec::new();
        for id in net.device_ids() {
            if let Some(host) = net.host(id) {
                flows.extend(host.flows().map(|f| flow_report(net, net.name(id), f, bin)));
            }
            if let Some(router) = net.router(id) {
                let routes = router
                    .routing_table()
                    .iter()
                    .map(|(&dest, &port)| RouteEntry {
                        dest: net.name(dest).to_string(),
                        next_hop: net.name(net.peer_device(port)).to_string(),
                        cost: router.costs().get(&dest).copied().unwrap_or(f64::INFINITY),
                    })
                    .collect();
                routing.push(RoutingReport {
                    router: net.name(id).to_string(),
                    routes,
                });
            }
        }

        let links = net
            .links()
            .iter()
            .enumerate()
            .map(|(i, link)| {
                let (from, to) = net.link_endpoints(LinkId(i));
                LinkReport {
                    id: i,
                    name: None,
                    from: net.name(from).to_string(),
                    to: net.name(to).to_string(),
                    rate_bps: link.rate_bps(),
                    delay_ns: link.delay().0,
                    packets_sent: link.tracker.packets_sent(),
                    bits_sent: link.tracker.bits_sent(),
                    losses: link.tracker.losses(),
                    mean_throughput_bps: link.throughput(SimTime::ZERO, end),
                    throughput: link.tracker.throughput_series(bin),
                    occupancy: link.tracker.occupancy_series(),
                    rtt_series: link.tracker.rtt_series(),
                }
            })
            .collect();

        Self {
            end_ns: end.0,
            processed_events: sim.processed_events(),
            stats: net.stats.clone(),
            devices,
            flows,
            links,
            routing,
        }
    }

    /// 给链路填上配置文件中的连接名
    pub fn name_links<'a>(&mut self, names: impl IntoIterator<Item = (&'a String, &'a LinkId)>) {
        let by_id: BTreeMap<usize, &String> = names.into_iter().map(|(n, id)| (id.0, n)).collect();
        for link in &mut self.links {
            link.name = by_id.get(&link.id).map(|n| n.to_string());
        }
    }

    /// 只保留被测量的流与链路；两个列表都为空时保留全部。
    pub fn retain_measured(&mut self, flows: &[String], links: &[String]) {
        if flows.is_empty() && links.is_empty() {
            return;
        }
        self.flows.retain(|f| flows.contains(&f.name));
        self.links
            .retain(|l| l.name.as_ref().is_some_and(|n| links.contains(n)));
    }

    pub fn flow(&self, name: &str) -> Option<&FlowReport> {
        self.flows.iter().find(|f| f.name == name)
    }

    pub fn link(&self, name: &str) -> Option<&LinkReport> {
        self.links.iter().find(|l| l.name.as_deref() == Some(name))
    }
}
