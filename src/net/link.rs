//! 链路类型
//!
//! 单向链路：速率、传播时延、目的端口、串行化占用时刻和统计追踪器。

use super::error::TopologyError;
use super::id::PortId;
use crate::proto::RecoveryPolicy;
use crate::sim::SimTime;
use crate::track::LinkTracker;

/// 路由代价参数：`static_weight * 传播时延 + dynamic_weight * 窗口内平均排队时延`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkCostConfig {
    pub static_weight: f64,
    pub dynamic_weight: f64,
    /// 统计平均排队时延的尾随时间窗
    pub window: SimTime,
}

impl Default for LinkCostConfig {
    fn default() -> Self {
        Self {
            static_weight: 1.0,
            dynamic_weight: 1.0,
            window: SimTime::from_secs(1),
        }
    }
}

impl LinkCostConfig {
    /// 只看传播时延的静态代价
    pub fn static_only() -> Self {
        Self {
            dynamic_weight: 0.0,
            ..Self::default()
        }
    }
}

/// 网络链路
#[derive(Debug)]
pub struct Link {
    from: PortId,
    to: PortId,
    rate_bps: u64,
    delay: SimTime,
    busy_until: SimTime,
    cost: LinkCostConfig,
    pub tracker: LinkTracker,
}

impl Link {
    /// 创建新链路（速率必须为正）
    pub fn new(from: PortId, to: PortId, rate_bps: u64, delay: SimTime) -> Result<Self, TopologyError> {
        if rate_bps == 0 {
            return Err(TopologyError::ZeroRate);
        }
        Ok(Self {
            from,
            to,
            rate_bps,
            delay,
            busy_until: SimTime::ZERO,
            cost: LinkCostConfig::default(),
            tracker: LinkTracker::default(),
        })
    }

    /// 发送端口
    pub fn source_port(&self) -> PortId {
        self.from
    }

    /// 目的端口
    pub fn dest_port(&self) -> PortId {
        self.to
    }

    pub fn rate_bps(&self) -> u64 {
        self.rate_bps
    }

    pub fn delay(&self) -> SimTime {
        self.delay
    }

    pub fn cost_config(&self) -> LinkCostConfig {
        self.cost
    }

    pub fn set_cost_config(&mut self, cost: LinkCostConfig) {
        self.cost = cost;
    }

    /// 计算传输指定 bits 所需的时间
    pub fn tx_time(&self, bits: u64) -> SimTime {
        // ceil(bits / bps) 秒 -> 纳秒
        let nanos = ((bits as u128).saturating_mul(1_000_000_000u128)
            + (self.rate_bps as u128 - 1))
            / self.rate_bps as u128;
        SimTime(nanos.min(u64::MAX as u128) as u64)
    }

    /// 预约一次串行化发送，返回开始发送的时刻。
    pub(crate) fn reserve(&mut self, now: SimTime, bits: u64) -> SimTime {
        let start = now.max(self.busy_until);
        self.busy_until = start.saturating_add(self.tx_time(bits));
        start
    }

    pub fn busy_until(&self) -> SimTime {
        self.busy_until
    }

    /// 当前路由代价：静态传播时延 + 尾随窗口内的平均排队时延。
    pub fn cost(&self, now: SimTime) -> f64 {
        let since = now.saturating_sub(self.cost.window);
        self.cost.static_weight * self.delay.as_secs_f64()
            + self.cost.dynamic_weight * self.tracker.mean_queueing_delay(since)
    }

    /// `since` 之后的平均 RTT（秒）；无样本时取 `fallback_factor` 倍传播时延。
    pub fn rtt(&self, since: SimTime, fallback_factor: f64) -> f64 {
        self.tracker
            .rtt()
            .mean_since(since)
            .unwrap_or(fallback_factor * self.delay.as_secs_f64())
    }

    /// 超时长度：平均 RTT + `deviation_weight` 倍标准差（不含 `min_timeout` 下限）。
    pub fn timeout(&self, since: SimTime, policy: &RecoveryPolicy) -> SimTime {
        let var = self.tracker.rtt().variance_since(since);
        SimTime::from_secs_f64(
            self.rtt(since, policy.fallback_rtt_factor) + policy.deviation_weight * var.sqrt(),
        )
    }

    /// `[since, until)` 内的平均吞吐量（bit/s）
    pub fn throughput(&self, since: SimTime, until: SimTime) -> f64 {
        self.tracker.throughput(since, until)
    }
}
