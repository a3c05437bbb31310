//! 网络拓扑管理
//!
//! 设备、端口与链路都放在 arena 中，用稳定下标互相引用；设备之间没有
//! 直接的指针。数据包在缓冲区与链路之间的搬运（入队、串行化、接收准入）
//! 也在这里完成，主机和路由器共享同一套规则。

use tracing::{debug, trace, warn};

use super::device::{Device, DeviceKind};
use super::error::TopologyError;
use super::host::Host;
use super::id::{DeviceId, LinkId, PortId};
use super::link::{Link, LinkCostConfig};
use super::packet::Packet;
use super::port::Port;
use super::router::{Router, RouterConfig};
use super::stats::Stats;
use crate::proto::{Flow, FlowSpec};
use crate::routing::RoutingAlgorithm;
use crate::sim::{Action, Event, SimTime};

/// 一条双向连接的参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkSpec {
    pub rate_bps: u64,
    pub delay: SimTime,
    /// 两端端口每个缓冲区的容量
    pub buffer_bytes: u64,
}

/// 一次串行化发送的结果
#[derive(Debug)]
pub struct Transmission {
    pub packet: Packet,
    pub tx_time: SimTime,
    /// 对端接收缓冲区接纳时产生的 Receive 事件
    pub delivery: Option<Event>,
}

/// 网络拓扑
#[derive(Debug, Default)]
pub struct Network {
    devices: Vec<Option<Box<dyn Device>>>,
    kinds: Vec<DeviceKind>,
    names: Vec<String>,
    ports: Vec<Port>,
    links: Vec<Link>,
    cost: LinkCostConfig,
    pub stats: Stats,
}

impl Network {
    fn push_device(&mut self, kind: DeviceKind, name: String, dev: Box<dyn Device>) -> DeviceId {
        let id = DeviceId(self.devices.len());
        self.devices.push(Some(dev));
        self.kinds.push(kind);
        self.names.push(name);
        id
    }

    /// 添加主机
    pub fn add_host(&mut self, name: impl Into<String>) -> DeviceId {
        let name = name.into();
        let id = DeviceId(self.devices.len());
        self.push_device(DeviceKind::Host, name.clone(), Box::new(Host::new(id, name)))
    }

    /// 添加路由器
    pub fn add_router(
        &mut self,
        name: impl Into<String>,
        algorithm: Box<dyn RoutingAlgorithm>,
        cfg: RouterConfig,
    ) -> DeviceId {
        let name = name.into();
        let id = DeviceId(self.devices.len());
        let router = Router::new(id, name.clone(), algorithm, cfg);
        self.push_device(DeviceKind::Router, name, Box::new(router))
    }

    fn check(&self, id: DeviceId) -> Result<(), TopologyError> {
        if id.0 < self.devices.len() {
            Ok(())
        } else {
            Err(TopologyError::UnknownDevice(id.0))
        }
    }

    fn ensure_attachable(&self, id: DeviceId) -> Result<(), TopologyError> {
        match self.host(id) {
            Some(h) if h.port().is_some() => {
                Err(TopologyError::HostAlreadyConnected(self.names[id.0].clone()))
            }
            _ => Ok(()),
        }
    }

    /// 连接两个设备：创建一对端口和两条方向相反的链路。
    /// 返回 `(a→b, b→a)` 两条链路。
    pub fn connect(
        &mut self,
        a: DeviceId,
        b: DeviceId,
        spec: LinkSpec,
    ) -> Result<(LinkId, LinkId), TopologyError> {
        self.check(a)?;
        self.check(b)?;
        if a == b {
            return Err(TopologyError::SelfLoop(self.names[a.0].clone()));
        }
        self.ensure_attachable(a)?;
        self.ensure_attachable(b)?;

        let pa = PortId(self.ports.len());
        let pb = PortId(pa.0 + 1);
        let la = LinkId(self.links.len());
        let lb = LinkId(la.0 + 1);

        let mut ab = Link::new(pa, pb, spec.rate_bps, spec.delay)?;
        let mut ba = Link::new(pb, pa, spec.rate_bps, spec.delay)?;
        ab.set_cost_config(self.cost);
        ba.set_cost_config(self.cost);

        for (dev, port) in [(a, pa), (b, pb)] {
            if let Some(d) = self.devices[dev.0].as_mut() {
                d.attach(port)?;
            }
        }

        self.links.push(ab);
        self.links.push(ba);
        self.ports.push(Port::new(a, la, spec.buffer_bytes));
        self.ports.push(Port::new(b, lb, spec.buffer_bytes));

        debug!(
            a = %self.names[a.0],
            b = %self.names[b.0],
            rate_bps = spec.rate_bps,
            delay = ?spec.delay,
            buffer_bytes = spec.buffer_bytes,
            "🔗 连接设备"
        );
        Ok((la, lb))
    }

    /// 在主机 `src` 上登记一条流
    pub fn add_flow(&mut self, src: DeviceId, spec: FlowSpec) -> Result<(), TopologyError> {
        self.check(src)?;
        self.check(spec.dest)?;
        let src_name = self.names[src.0].clone();
        let dest_name = self.names[spec.dest.0].clone();

        let host = self.devices[src.0]
            .as_mut()
            .and_then(|d| d.as_any_mut().downcast_mut::<Host>())
            .ok_or_else(|| TopologyError::NotAHost(src_name.clone()))?;
        host.connect(Flow::new(spec)).map_err(|_| TopologyError::DuplicateFlow {
            host: src_name,
            dest: dest_name,
        })
    }

    pub fn device_ids(&self) -> impl Iterator<Item = DeviceId> + use<> {
        (0..self.devices.len()).map(DeviceId)
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub fn kind(&self, id: DeviceId) -> DeviceKind {
        self.kinds[id.0]
    }

    pub fn name(&self, id: DeviceId) -> &str {
        &self.names[id.0]
    }

    /// 按名称查找设备
    pub fn find(&self, name: &str) -> Option<DeviceId> {
        self.names.iter().position(|n| n == name).map(DeviceId)
    }

    pub fn port(&self, id: PortId) -> &Port {
        &self.ports[id.0]
    }

    pub fn port_mut(&mut self, id: PortId) -> &mut Port {
        &mut self.ports[id.0]
    }

    pub fn port_count(&self) -> usize {
        self.ports.len()
    }

    /// 某设备的全部端口
    pub fn ports_of(&self, dev: DeviceId) -> Vec<PortId> {
        self.ports
            .iter()
            .enumerate()
            .filter(|(_, p)| p.device == dev)
            .map(|(i, _)| PortId(i))
            .collect()
    }

    pub fn link(&self, id: LinkId) -> &Link {
        &self.links[id.0]
    }

    pub fn link_mut(&mut self, id: LinkId) -> &mut Link {
        &mut self.links[id.0]
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// 从端口发出的链路
    pub fn link_of(&self, port: PortId) -> &Link {
        &self.links[self.ports[port.0].link.0]
    }

    /// 链路另一端的端口
    pub fn peer_port(&self, port: PortId) -> PortId {
        self.link_of(port).dest_port()
    }

    /// 链路另一端的设备
    pub fn peer_device(&self, port: PortId) -> DeviceId {
        self.ports[self.peer_port(port).0].device
    }

    /// 链路的发送端设备与接收端设备
    pub fn link_endpoints(&self, id: LinkId) -> (DeviceId, DeviceId) {
        let link = &self.links[id.0];
        (
            self.ports[link.source_port().0].device,
            self.ports[link.dest_port().0].device,
        )
    }

    pub fn device(&self, id: DeviceId) -> Option<&dyn Device> {
        self.devices.get(id.0)?.as_deref()
    }

    pub fn host(&self, id: DeviceId) -> Option<&Host> {
        self.device(id)?.as_any().downcast_ref::<Host>()
    }

    pub fn router(&self, id: DeviceId) -> Option<&Router> {
        self.device(id)?.as_any().downcast_ref::<Router>()
    }

    pub fn set_incoming_capacity(&mut self, port: PortId, bytes: u64) {
        self.ports[port.0].incoming.set_capacity_bytes(bytes);
    }

    pub fn set_outgoing_capacity(&mut self, port: PortId, bytes: u64) {
        self.ports[port.0].outgoing.set_capacity_bytes(bytes);
    }

    /// 修改所有（已有与之后创建的）链路的路由代价参数
    pub fn set_link_cost_config(&mut self, cost: LinkCostConfig) {
        self.cost = cost;
        for link in &mut self.links {
            link.set_cost_config(cost);
        }
    }

    /// 放入端口的出口缓冲区，并预约链路的串行化时段。
    ///
    /// 接纳时返回在开始发送时刻触发的 Send 事件；被拒绝时记为该链路上的丢包。
    pub(crate) fn enqueue_outgoing(
        &mut self,
        port: PortId,
        pkt: Packet,
        now: SimTime,
    ) -> Option<Event> {
        let bits = pkt.size_bits;
        let p = &mut self.ports[port.0];
        let link = &mut self.links[p.link.0];

        match p.outgoing.push(pkt.clone(), now) {
            Ok(()) => {
                link.tracker.record_buffer_occupancy(now, p.outgoing.bytes());
                let start = link.reserve(now, bits);
                trace!(port = ?port, seq = pkt.seq, start = ?start, "📥 进入出口缓冲区");
                Some(Event::new(start, port, Action::Send, pkt))
            }
            Err(dropped) => {
                link.tracker.record_packet_loss(now);
                self.stats.dropped_pkts += 1;
                warn!(
                    port = ?port,
                    seq = dropped.seq,
                    size_bytes = dropped.size_bytes(),
                    queued_bytes = p.outgoing.bytes(),
                    "🗑️  出口缓冲区已满，丢弃数据包"
                );
                None
            }
        }
    }

    /// 把出口缓冲区的队头交给链路。
    ///
    /// 对端入口缓冲区接纳时产生一个 `now + tx_time + delay` 的 Receive 事件，否则记为丢包。
    pub(crate) fn transmit(&mut self, port: PortId, now: SimTime) -> Option<Transmission> {
        let p = &mut self.ports[port.0];
        let queued = p.outgoing.pop()?;
        let link_id = p.link;
        let out_bytes = p.outgoing.bytes();

        let link = &mut self.links[link_id.0];
        link.tracker
            .record_queueing_delay(now, now.saturating_sub(queued.since));
        link.tracker.record_buffer_occupancy(now, out_bytes);

        let packet = queued.packet;
        let bits = packet.size_bits;
        let tx_time = link.tx_time(bits);
        let arrive = now.saturating_add(tx_time).saturating_add(link.delay());
        let peer = link.dest_port();

        let delivery = match self.ports[peer.0].incoming.push(packet.clone(), now) {
            Ok(()) => {
                link.tracker.record_sent(now, bits);
                trace!(port = ?port, peer = ?peer, seq = packet.seq, arrive = ?arrive, "📤 发往链路");
                Some(Event::new(arrive, peer, Action::Receive, packet.clone()))
            }
            Err(dropped) => {
                link.tracker.record_packet_loss(now);
                self.stats.dropped_pkts += 1;
                warn!(
                    port = ?port,
                    peer = ?peer,
                    seq = dropped.seq,
                    size_bytes = dropped.size_bytes(),
                    "🗑️  对端入口缓冲区已满，丢弃数据包"
                );
                None
            }
        };

        Some(Transmission {
            packet,
            tx_time,
            delivery,
        })
    }

    /// 从入口缓冲区取出最早到达的数据包
    pub(crate) fn take_arrival(&mut self, port: PortId) -> Option<Packet> {
        self.ports[port.0].incoming.pop().map(|q| q.packet)
    }

    /// 调用设备的 `initialize`
    pub(crate) fn initialize_device(&mut self, id: DeviceId) -> Vec<Event> {
        // 暂时把设备取出来，避免 &mut self 与 &mut device 的重叠借用。
        let Some(mut dev) = self.devices.get_mut(id.0).and_then(Option::take) else {
            return Vec::new();
        };
        let events = dev.initialize(self);
        self.devices[id.0] = Some(dev);
        events
    }

    /// 把事件交给端口所属的设备处理
    #[tracing::instrument(skip(self, ev), fields(port = ?ev.port, action = ?ev.action, seq = ev.packet.seq))]
    pub(crate) fn dispatch(&mut self, ev: Event) -> Vec<Event> {
        let Some(port) = self.ports.get(ev.port.0) else {
            warn!("事件指向不存在的端口，忽略");
            return Vec::new();
        };
        let id = port.device;

        let Some(mut dev) = self.devices[id.0].take() else {
            warn!(device = %self.names[id.0], "设备正在处理其它事件，忽略");
            return Vec::new();
        };
        trace!(device = %dev.name(), "取出设备");

        let events = dev.process(ev, self);

        trace!(spawned = events.len(), "设备处理完成，放回设备");
        self.devices[id.0] = Some(dev);
        events
    }
}
