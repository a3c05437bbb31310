//! 动态路由支持
//!
//! 路由器不预先知道全网拓扑：每个路由器只知道自己直连链路的当前代价，
//! 通过与相邻路由器交换代价表（路由通告）逐步收敛出到各目的地的下一跳。

mod bellman_ford;
mod static_routes;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::net::{DeviceId, Network, Packet, PortId};
use crate::sim::SimTime;

pub use bellman_ford::BellmanFord;
pub use static_routes::Static;

/// 路由算法参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoutingConfig {
    /// 代价变化小于该值时不算更优/更差，避免路由抖动
    pub hysteresis: f64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self { hysteresis: 1e-4 }
    }
}

/// 路由算法接口。每个实例只属于一个路由器。
pub trait RoutingAlgorithm: fmt::Debug + Send {
    /// 通告包上的协议标签
    fn tag(&self) -> &'static str;

    /// 是否需要与相邻路由器交换通告
    fn advertises(&self) -> bool {
        true
    }

    /// 用直连邻居（设备, 出端口）和当前链路代价建立初始路由表
    fn initialize(&mut self, me: DeviceId, neighbors: &[(DeviceId, PortId)], net: &Network, now: SimTime);

    /// 到 `dest` 的出端口
    fn next(&self, dest: DeviceId) -> Option<PortId>;

    /// 在通告包上附加代价表快照与协议标签
    fn prepare(&self, now: SimTime, pkt: &mut Packet);

    /// 用邻居发来的通告更新路由表；返回是否有变化
    fn update(&mut self, now: SimTime, pkt: &Packet, net: &Network) -> bool;

    fn costs(&self) -> &BTreeMap<DeviceId, f64>;

    fn routing_table(&self) -> &BTreeMap<DeviceId, PortId>;
}

/// 路由算法种类（配置文件中的标签）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoutingKind {
    BellmanFord,
    /// 只路由到直连邻居
    Static,
}

impl RoutingKind {
    pub fn build(self, cfg: &RoutingConfig) -> Box<dyn RoutingAlgorithm> {
        match self {
            RoutingKind::BellmanFord => Box::new(BellmanFord::new(cfg.hysteresis)),
            RoutingKind::Static => Box::new(Static::default()),
        }
    }
}

impl FromStr for RoutingKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bellman-ford" | "bellmanford" => Ok(RoutingKind::BellmanFord),
            "static" => Ok(RoutingKind::Static),
            other => Err(other.to_string()),
        }
    }
}
