//! 网络模拟模块
//!
//! 此模块包含网络模拟的核心组件：设备（主机、路由器）、端口、链路、
//! 数据包以及持有它们的网络 arena。

// 子模块声明
mod device;
mod error;
mod host;
mod id;
mod link;
mod network;
mod packet;
mod port;
mod router;
mod stats;

// 重新导出公共接口
pub use device::{Device, DeviceKind};
pub use error::TopologyError;
pub use host::Host;
pub use id::{DeviceId, LinkId, PortId};
pub use link::{Link, LinkCostConfig};
pub use network::{LinkSpec, Network, Transmission};
pub use packet::{ACK_PACKET_BITS, DATA_PACKET_BITS, DataKey, Datum, Packet};
pub use port::Port;
pub use router::{Router, RouterConfig};
pub use stats::Stats;
