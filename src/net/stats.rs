//! 统计信息
//!
//! 定义全网范围的仿真计数器。

use serde::Serialize;

/// 网络统计信息
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Stats {
    /// 送达目的主机的数据包（每个源的每个序号只计一次）
    pub delivered_pkts: u64,
    pub delivered_bits: u64,
    /// 已送达过的重传副本
    pub duplicate_pkts: u64,
    /// 源端收到的确认包
    pub acks_received: u64,
    /// 因缓冲区满被丢弃的包
    pub dropped_pkts: u64,
    /// 路由表中没有下一跳而被丢弃的包
    pub unroutable_pkts: u64,
    /// 生效的重传超时
    pub timeouts: u64,
    /// 路由器发出的路由通告
    pub advertisements: u64,
}
