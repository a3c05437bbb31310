//! 静态路由：只认识直连邻居，从不通告也不更新。
//!
//! 作为动态路由的对照基线。

use std::collections::BTreeMap;

use tracing::debug;

use super::RoutingAlgorithm;
use crate::net::{DeviceId, Network, Packet, PortId};
use crate::sim::SimTime;

#[derive(Debug, Clone, Default)]
pub struct Static {
    costs: BTreeMap<DeviceId, f64>,
    table: BTreeMap<DeviceId, PortId>,
}

impl RoutingAlgorithm for Static {
    fn tag(&self) -> &'static str {
        "static"
    }

    fn advertises(&self) -> bool {
        false
    }

    fn initialize(&mut self, me: DeviceId, neighbors: &[(DeviceId, PortId)], net: &Network, now: SimTime) {
        self.costs = neighbors
            .iter()
            .map(|&(dev, port)| (dev, net.link_of(port).cost(now)))
            .collect();
        self.table = neighbors.iter().copied().collect();
        debug!(router = %me, routes = self.table.len(), "静态路由表");
    }

    fn next(&self, dest: DeviceId) -> Option<PortId> {
        self.table.get(&dest).copied()
    }

    fn prepare(&self, _now: SimTime, _pkt: &mut Packet) {}

    fn update(&mut self, _now: SimTime, _pkt: &Packet, _net: &Network) -> bool {
        false
    }

    fn costs(&self) -> &BTreeMap<DeviceId, f64> {
        &self.costs
    }

    fn routing_table(&self) -> &BTreeMap<DeviceId, PortId> {
        &self.table
    }
}
