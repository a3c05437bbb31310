//! 路由器
//!
//! 按路由表转发数据包，并与直连的路由器交换路由通告。每个相邻路由器对应
//! 一条无限数据的通告流（AIMD），通告本身也走缓冲区与链路，会排队、会丢、
//! 超时后重发。

use std::any::Any;
use std::collections::BTreeMap;

use tracing::{debug, trace, warn};

use super::device::{Device, DeviceKind};
use super::error::TopologyError;
use super::id::{DeviceId, PortId};
use super::network::Network;
use super::packet::{DATA_PACKET_BITS, Packet};
use crate::proto::{AckOutcome, CongestionKind, Flow, FlowConfig, FlowSpec};
use crate::routing::RoutingAlgorithm;
use crate::sim::{Action, Event, SimTime};

/// 周期性刷新的定时包序号（变化触发的轮次用 0）
const REFRESH_TICK: u64 = 1;

/// 路由器参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouterConfig {
    /// 路由通告包大小（bits）
    pub advert_bits: u64,
    /// 两轮通告之间的最小间隔
    pub min_update_interval: SimTime,
    /// 周期性重新通告；`None` 表示只在路由表变化时通告
    pub refresh_interval: Option<SimTime>,
    /// 通告流参数
    pub flow: FlowConfig,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            advert_bits: DATA_PACKET_BITS,
            min_update_interval: SimTime::from_millis(10),
            refresh_interval: None,
            flow: FlowConfig::default(),
        }
    }
}

/// 路由器
#[derive(Debug)]
pub struct Router {
    id: DeviceId,
    name: String,
    ports: Vec<PortId>,
    algorithm: Box<dyn RoutingAlgorithm>,
    cfg: RouterConfig,
    /// 相邻路由器 -> 通告流
    flows: BTreeMap<DeviceId, Flow>,
    /// 直连设备 -> 端口
    neighbor_ports: BTreeMap<DeviceId, PortId>,
    round_pending: bool,
    last_round: Option<SimTime>,
}

impl Router {
    pub fn new(
        id: DeviceId,
        name: impl Into<String>,
        algorithm: Box<dyn RoutingAlgorithm>,
        cfg: RouterConfig,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            ports: Vec::new(),
            algorithm,
            cfg,
            flows: BTreeMap::new(),
            neighbor_ports: BTreeMap::new(),
            round_pending: false,
            last_round: None,
        }
    }

    pub fn ports(&self) -> &[PortId] {
        &self.ports
    }

    pub fn config(&self) -> &RouterConfig {
        &self.cfg
    }

    pub fn algorithm(&self) -> &dyn RoutingAlgorithm {
        self.algorithm.as_ref()
    }

    /// 到 `dest` 的出端口
    pub fn next(&self, dest: DeviceId) -> Option<PortId> {
        self.algorithm.next(dest)
    }

    pub fn routing_table(&self) -> &BTreeMap<DeviceId, PortId> {
        self.algorithm.routing_table()
    }

    pub fn costs(&self) -> &BTreeMap<DeviceId, f64> {
        self.algorithm.costs()
    }

    /// 到相邻路由器的通告流
    pub fn flow(&self, neighbor: DeviceId) -> Option<&Flow> {
        self.flows.get(&neighbor)
    }

    pub fn flows(&self) -> impl Iterator<Item = &Flow> {
        self.flows.values()
    }

    pub fn neighbors(&self) -> impl Iterator<Item = DeviceId> + '_ {
        self.neighbor_ports.keys().copied()
    }

    fn tick(&self, at: SimTime, seq: u64) -> Option<Event> {
        let port = *self.ports.first()?;
        let mut pkt = Packet::new(self.id, self.id, 0);
        pkt.seq = seq;
        Some(Event::new(at, port, Action::Create, pkt))
    }

    /// 安排一轮通告：同一时刻最多一轮在等待，且两轮间隔不小于 `min_update_interval`。
    fn schedule_round(&mut self, now: SimTime) -> Option<Event> {
        if self.round_pending {
            return None;
        }
        let at = match self.last_round {
            Some(last) => now.max(last.saturating_add(self.cfg.min_update_interval)),
            None => now,
        };
        let ev = self.tick(at, 0)?;
        self.round_pending = true;
        trace!(router = %self.name, at = ?at, "安排新一轮路由通告");
        Some(ev)
    }

    fn advert_create(&self, at: SimTime, neighbor: DeviceId) -> Option<Event> {
        let port = *self.neighbor_ports.get(&neighbor)?;
        Some(Event::new(
            at,
            port,
            Action::Create,
            Packet::new(self.id, neighbor, self.cfg.advert_bits),
        ))
    }

    fn fan_out(&self, now: SimTime) -> Vec<Event> {
        self.flows
            .keys()
            .filter_map(|&n| self.advert_create(now, n))
            .collect()
    }

    fn handle_tick(&mut self, ev: Event) -> Vec<Event> {
        let now = ev.at;
        let mut events = Vec::new();

        if ev.packet.seq == REFRESH_TICK {
            if let Some(interval) = self.cfg.refresh_interval {
                events.extend(self.tick(now.saturating_add(interval), REFRESH_TICK));
            }
        } else {
            self.round_pending = false;
        }
        self.last_round = Some(now);

        debug!(router = %self.name, neighbors = self.flows.len(), "📣 新一轮路由通告");
        events.extend(self.fan_out(now));
        events
    }

    /// 通告总是发出，不受窗口限制
    fn handle_create(&mut self, ev: Event, net: &mut Network) -> Vec<Event> {
        if ev.packet.dest == self.id {
            return self.handle_tick(ev);
        }

        let now = ev.at;
        let neighbor = ev.packet.dest;
        let (Some(flow), Some(&port)) = (self.flows.get_mut(&neighbor), self.neighbor_ports.get(&neighbor))
        else {
            return Vec::new();
        };

        let mut pkt = Packet::new(self.id, neighbor, self.cfg.advert_bits);
        flow.prepare(&mut pkt, now);
        self.algorithm.prepare(now, &mut pkt);
        net.stats.advertisements += 1;

        match net.enqueue_outgoing(port, pkt.clone(), now) {
            Some(send) => vec![send],
            None => {
                let at = now.saturating_add(flow.timeout(now, net.link_of(port)));
                vec![Event::new(at, port, Action::Timeout, pkt)]
            }
        }
    }

    fn handle_send(&mut self, ev: Event, net: &mut Network) -> Vec<Event> {
        let now = ev.at;
        let port = ev.port;
        let Some(tx) = net.transmit(port, now) else {
            return Vec::new();
        };

        let mut events = Vec::new();
        events.extend(tx.delivery);

        let pkt = tx.packet;
        if pkt.source != self.id || pkt.is_ack() {
            return events;
        }
        if let Some(flow) = self.flows.get_mut(&pkt.dest) {
            flow.tracker.record_sent(now, pkt.size_bits);
            let at = now.saturating_add(flow.timeout(now, net.link_of(port)));
            events.push(Event::new(at, port, Action::Timeout, pkt));
        }
        events
    }

    fn handle_receive(&mut self, ev: Event, net: &mut Network) -> Vec<Event> {
        let now = ev.at;
        let port = ev.port;
        let Some(pkt) = net.take_arrival(port) else {
            return Vec::new();
        };

        if pkt.dest != self.id {
            return match self.algorithm.next(pkt.dest) {
                Some(out) => net.enqueue_outgoing(out, pkt, now).into_iter().collect(),
                None => {
                    net.stats.unroutable_pkts += 1;
                    warn!(router = %self.name, dest = %pkt.dest, seq = pkt.seq, "没有到目的地的路由，丢弃");
                    Vec::new()
                }
            };
        }

        if pkt.is_ack() {
            // 通告流的 ACK 只做统计，不驱动新的发送
            let outcome = self.flows.get_mut(&pkt.source).map(|f| f.on_ack(&pkt, now));
            if let Some(AckOutcome::New { rtt_secs }) = outcome {
                let link = net.port(port).link;
                net.link_mut(link).tracker.record_round_trip(now, rtt_secs);
            }
            return Vec::new();
        }

        let changed = pkt.protocol() == Some(self.algorithm.tag())
            && self.algorithm.update(now, &pkt, net);

        let mut events = Vec::new();
        let back = self.algorithm.next(pkt.source).unwrap_or(port);
        events.extend(net.enqueue_outgoing(back, pkt.ack_for(), now));

        if changed {
            events.extend(self.schedule_round(now));
        }
        events
    }

    fn handle_timeout(&mut self, ev: Event, net: &mut Network) -> Vec<Event> {
        let now = ev.at;
        let pkt = ev.packet;
        let Some(flow) = self.flows.get_mut(&pkt.dest) else {
            return Vec::new();
        };
        if !flow.on_timeout(pkt.seq, pkt.created_at, now) {
            return Vec::new();
        }

        net.stats.timeouts += 1;
        debug!(router = %self.name, neighbor = %pkt.dest, seq = pkt.seq, "通告超时，重新通告");
        // 用当前代价重新通告，而不是重发旧快照
        self.advert_create(now, pkt.dest).into_iter().collect()
    }
}

impl Device for Router {
    fn id(&self) -> DeviceId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> DeviceKind {
        DeviceKind::Router
    }

    fn attach(&mut self, port: PortId) -> Result<(), TopologyError> {
        self.ports.push(port);
        Ok(())
    }

    fn initialize(&mut self, net: &mut Network) -> Vec<Event> {
        let now = SimTime::ZERO;
        let neighbors: Vec<(DeviceId, PortId)> = self
            .ports
            .iter()
            .map(|&p| (net.peer_device(p), p))
            .collect();

        self.neighbor_ports = neighbors.iter().copied().collect();
        self.flows.clear();
        for &(dev, _) in &neighbors {
            if net.kind(dev) != DeviceKind::Router || !self.algorithm.advertises() {
                continue;
            }
            let spec = FlowSpec::new(format!("{}->{}", self.name, net.name(dev)), dev, None, now)
                .with_congestion(CongestionKind::Aimd)
                .with_config(FlowConfig {
                    packet_bits: self.cfg.advert_bits,
                    ..self.cfg.flow
                });
            self.flows.insert(dev, Flow::new(spec));
        }

        self.algorithm.initialize(self.id, &neighbors, net, now);
        self.last_round = Some(now);

        let mut events = self.fan_out(now);
        if let Some(interval) = self.cfg.refresh_interval {
            events.extend(self.tick(now.saturating_add(interval), REFRESH_TICK));
        }

        debug!(
            router = %self.name,
            ports = self.ports.len(),
            peers = self.flows.len(),
            "🧭 路由器初始化"
        );
        events
    }

    #[tracing::instrument(skip(self, ev, net), fields(router = %self.name, action = ?ev.action, at = ?ev.at))]
    fn process(&mut self, ev: Event, net: &mut Network) -> Vec<Event> {
        debug!("🔀 Router 处理事件");
        match ev.action {
            Action::Create => self.handle_create(ev, net),
            Action::Send => self.handle_send(ev, net),
            Action::Receive => self.handle_receive(ev, net),
            Action::Timeout => self.handle_timeout(ev, net),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
