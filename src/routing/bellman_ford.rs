//! 分布式 Bellman-Ford（距离向量）
//!
//! 收到邻居 N 的代价表后，对表中每个目的地 D 计算候选代价
//! `cost_N(D) + cost(本机→N 的链路)`：
//! - D 未知，或候选比当前更优（超出滞回阈值）：采用，下一跳改为 N；
//! - 当前路由正经由 N 且候选严格变差：只更新代价（N 的路径变坏了，本机也得知道）。
//!
//! 滞回阈值只用于换路，变差总是如实跟进。
//!
//! 到 N 本身的直连代价按同样规则用当前链路代价松弛。

use std::collections::BTreeMap;

use tracing::{debug, trace};

use super::RoutingAlgorithm;
use crate::net::{DataKey, Datum, DeviceId, Network, Packet, PortId};
use crate::sim::SimTime;

const TAG: &str = "bellman-ford";

#[derive(Debug, Clone)]
pub struct BellmanFord {
    me: Option<DeviceId>,
    hysteresis: f64,
    /// 直连邻居 -> 出端口
    neighbors: BTreeMap<DeviceId, PortId>,
    costs: BTreeMap<DeviceId, f64>,
    table: BTreeMap<DeviceId, PortId>,
}

impl Default for BellmanFord {
    fn default() -> Self {
        Self::new(super::RoutingConfig::default().hysteresis)
    }
}

impl BellmanFord {
    pub fn new(hysteresis: f64) -> Self {
        Self {
            me: None,
            hysteresis: if hysteresis.is_finite() { hysteresis.max(0.0) } else { 0.0 },
            neighbors: BTreeMap::new(),
            costs: BTreeMap::new(),
            table: BTreeMap::new(),
        }
    }

    fn relax(&mut self, dest: DeviceId, candidate: f64, via: PortId) -> bool {
        let current = self.costs.get(&dest).copied();
        let route = self.table.get(&dest).copied();
        match (current, route) {
            (Some(cur), Some(port)) => {
                if candidate < cur - self.hysteresis {
                    self.costs.insert(dest, candidate);
                    self.table.insert(dest, via);
                    true
                } else if port == via && candidate > cur {
                    self.costs.insert(dest, candidate);
                    true
                } else {
                    false
                }
            }
            _ => {
                self.costs.insert(dest, candidate);
                self.table.insert(dest, via);
                true
            }
        }
    }
}

impl RoutingAlgorithm for BellmanFord {
    fn tag(&self) -> &'static str {
        TAG
    }

    fn initialize(&mut self, me: DeviceId, neighbors: &[(DeviceId, PortId)], net: &Network, now: SimTime) {
        self.me = Some(me);
        self.neighbors.clear();
        self.costs.clear();
        self.table.clear();

        for &(dev, port) in neighbors {
            let cost = net.link_of(port).cost(now);
            self.neighbors.insert(dev, port);
            self.costs.insert(dev, cost);
            self.table.insert(dev, port);
        }
        debug!(router = %me, neighbors = neighbors.len(), "🧭 Bellman-Ford 初始化");
    }

    fn next(&self, dest: DeviceId) -> Option<PortId> {
        self.table.get(&dest).copied()
    }

    fn prepare(&self, _now: SimTime, pkt: &mut Packet) {
        pkt.set_datum(DataKey::Costs, Datum::Costs(self.costs.clone()));
        pkt.set_datum(DataKey::Protocol, Datum::Protocol(TAG));
    }

    fn update(&mut self, now: SimTime, pkt: &Packet, net: &Network) -> bool {
        let Some(advertised) = pkt.costs() else {
            return false;
        };
        let via = pkt.source;
        let Some(&port) = self.neighbors.get(&via) else {
            trace!(from = %via, "通告来自非直连设备，忽略");
            return false;
        };
        let hop = net.link_of(port).cost(now);

        let mut changed = self.relax(via, hop, port);
        for (&dest, &cost) in advertised {
            if Some(dest) == self.me {
                continue;
            }
            changed |= self.relax(dest, cost + hop, port);
        }

        if changed {
            trace!(from = %via, routes = self.table.len(), "路由表更新");
        }
        changed
    }

    fn costs(&self) -> &BTreeMap<DeviceId, f64> {
        &self.costs
    }

    fn routing_table(&self) -> &BTreeMap<DeviceId, PortId> {
        &self.table
    }
}
