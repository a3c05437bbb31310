//! 主机
//!
//! 端点设备：只有一个端口，是流的源与汇。收到数据包时回 ACK，
//! 收到 ACK 时推进对应的流，并在窗口允许时继续发送。

use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info, trace, warn};

use super::device::{Device, DeviceKind};
use super::error::TopologyError;
use super::id::{DeviceId, PortId};
use super::network::Network;
use super::packet::Packet;
use crate::proto::{AckOutcome, Flow};
use crate::sim::{Action, Event, SimTime};

/// 主机
#[derive(Debug)]
pub struct Host {
    id: DeviceId,
    name: String,
    port: Option<PortId>,
    flows: BTreeMap<DeviceId, Flow>,
    /// 每个源已收到的序号
    received: BTreeMap<DeviceId, BTreeSet<u64>>,
}

impl Host {
    /// 创建新主机
    pub fn new(id: DeviceId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            port: None,
            flows: BTreeMap::new(),
            received: BTreeMap::new(),
        }
    }

    pub fn port(&self) -> Option<PortId> {
        self.port
    }

    /// 登记一条流；同一目的地只能有一条流，冲突时返回该目的地。
    pub fn connect(&mut self, flow: Flow) -> Result<(), DeviceId> {
        let dest = flow.dest();
        if self.flows.contains_key(&dest) {
            return Err(dest);
        }
        self.flows.insert(dest, flow);
        Ok(())
    }

    pub fn flow(&self, dest: DeviceId) -> Option<&Flow> {
        self.flows.get(&dest)
    }

    pub fn flows(&self) -> impl Iterator<Item = &Flow> {
        self.flows.values()
    }

    fn template(&self, dest: DeviceId) -> Packet {
        Packet::data_packet(self.id, dest)
    }

    fn create_at(&self, at: SimTime, port: PortId, dest: DeviceId) -> Event {
        Event::new(at, port, Action::Create, self.template(dest))
    }

    fn handle_create(&mut self, ev: Event, net: &mut Network) -> Vec<Event> {
        let now = ev.at;
        let dest = ev.packet.dest;
        let Some(port) = self.port else {
            return Vec::new();
        };
        let Some(flow) = self.flows.get_mut(&dest) else {
            return Vec::new();
        };
        if !flow.can_send() {
            trace!(window = flow.window(), unacked = flow.unacked_count(), "窗口已满或无数据");
            return Vec::new();
        }

        let mut pkt = Packet::data_packet(self.id, dest);
        flow.prepare(&mut pkt, now);

        match net.enqueue_outgoing(port, pkt.clone(), now) {
            Some(send) => vec![send],
            None => {
                // 唯一的恢复途径：直接挂一个超时
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
        let Some(flow) = self.flows.get_mut(&pkt.dest) else {
            return events;
        };

        flow.tracker.record_sent(now, pkt.size_bits);
        let timeout_at = now.saturating_add(flow.timeout(now, net.link_of(port)));
        let next = flow.can_send();
        let dest = pkt.dest;
        events.push(Event::new(timeout_at, port, Action::Timeout, pkt));

        if next {
            events.push(self.create_at(now.saturating_add(tx.tx_time), port, dest));
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
            // 主机不转发
            net.stats.unroutable_pkts += 1;
            warn!(host = %self.name, dest = %pkt.dest, seq = pkt.seq, "收到不属于本主机的数据包，丢弃");
            return Vec::new();
        }

        if !pkt.is_ack() {
            // 重传的副本照样确认，但只按首次送达计数
            if self.received.entry(pkt.source).or_default().insert(pkt.seq) {
                net.stats.delivered_pkts += 1;
                net.stats.delivered_bits += pkt.size_bits;
                trace!(host = %self.name, seq = pkt.seq, from = %pkt.source, "✅ 数据包送达，回 ACK");
            } else {
                net.stats.duplicate_pkts += 1;
                trace!(host = %self.name, seq = pkt.seq, from = %pkt.source, "🔁 重复数据包，回 ACK");
            }
            return net.enqueue_outgoing(port, pkt.ack_for(), now).into_iter().collect();
        }

        net.stats.acks_received += 1;
        let peer = pkt.source;
        let Some(flow) = self.flows.get_mut(&peer) else {
            debug!(host = %self.name, from = %peer, "收到无对应流的 ACK");
            return Vec::new();
        };

        let outcome = flow.on_ack(&pkt, now);
        if let AckOutcome::New { rtt_secs } = outcome {
            let link = net.port(port).link;
            net.link_mut(link).tracker.record_round_trip(now, rtt_secs);
            if flow.is_complete() {
                info!(host = %self.name, flow = %flow.name(), at = ?now, "🏁 流传输完成");
            }
        }

        let more = flow.can_send();
        match outcome {
            AckOutcome::New { .. } | AckOutcome::FastRecovery if more => {
                vec![self.create_at(now, port, peer)]
            }
            _ => Vec::new(),
        }
    }

    fn handle_timeout(&mut self, ev: Event, net: &mut Network) -> Vec<Event> {
        let now = ev.at;
        let pkt = ev.packet;
        let Some(flow) = self.flows.get_mut(&pkt.dest) else {
            return Vec::new();
        };
        if !flow.on_timeout(pkt.seq, pkt.created_at, now) {
            trace!(seq = pkt.seq, "过期的超时，忽略");
            return Vec::new();
        }

        net.stats.timeouts += 1;
        if flow.can_send() {
            vec![self.create_at(now, ev.port, pkt.dest)]
        } else {
            Vec::new()
        }
    }
}

impl Device for Host {
    fn id(&self) -> DeviceId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> DeviceKind {
        DeviceKind::Host
    }

    fn attach(&mut self, port: PortId) -> Result<(), TopologyError> {
        if self.port.is_some() {
            return Err(TopologyError::HostAlreadyConnected(self.name.clone()));
        }
        self.port = Some(port);
        Ok(())
    }

    fn initialize(&mut self, _net: &mut Network) -> Vec<Event> {
        let Some(port) = self.port else {
            if !self.flows.is_empty() {
                warn!(host = %self.name, "主机没有端口，流不会启动");
            }
            return Vec::new();
        };
        self.flows
            .values()
            .map(|f| self.create_at(f.start(), port, f.dest()))
            .collect()
    }

    #[tracing::instrument(skip(self, ev, net), fields(host = %self.name, action = ?ev.action, at = ?ev.at))]
    fn process(&mut self, ev: Event, net: &mut Network) -> Vec<Event> {
        debug!("🖥️  Host 处理事件");
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
