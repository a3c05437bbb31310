//! 流：一条源→目的的可靠传输会话
//!
//! 维护拥塞窗口、下一个序号、未确认（在途）包集合、剩余待发 bits 以及
//! 重复 ACK 计数；丢包恢复采用 go-back-N 回滚。

use std::collections::BTreeMap;

use tracing::{debug, trace};

use super::congestion::{
    CongestionAlgorithm, CongestionConfig, CongestionKind, CongestionState, RttEstimate, Window,
};
use crate::net::{DATA_PACKET_BITS, DeviceId, Link, Packet};
use crate::sim::SimTime;
use crate::track::FlowTracker;

/// 丢包恢复参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecoveryPolicy {
    /// 超时 = 平均 RTT + `deviation_weight` × 标准差
    pub deviation_weight: f64,
    /// 无 RTT 样本时，超时 = `fallback_rtt_factor` × 链路传播时延
    pub fallback_rtt_factor: f64,
    /// 超时下限
    pub min_timeout: SimTime,
    /// 同一序号的重复 ACK 达到该次数时触发快速恢复
    pub dup_ack_threshold: u32,
}

impl Default for RecoveryPolicy {
    fn default() -> Self {
        Self {
            deviation_weight: 4.0,
            fallback_rtt_factor: 3.0,
            min_timeout: SimTime::from_millis(100),
            dup_ack_threshold: 3,
        }
    }
}

/// 流参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowConfig {
    pub congestion: CongestionConfig,
    pub recovery: RecoveryPolicy,
    /// 计算超时与 FAST 平均 RTT 时只看最近这段时间的样本；`None` 表示全部样本
    pub rtt_window: Option<SimTime>,
    /// 单个数据包的最大大小（bits）
    pub packet_bits: u64,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            congestion: CongestionConfig::default(),
            recovery: RecoveryPolicy::default(),
            rtt_window: None,
            packet_bits: DATA_PACKET_BITS,
        }
    }
}

/// 构造一条流所需的描述
#[derive(Debug, Clone)]
pub struct FlowSpec {
    pub name: String,
    pub dest: DeviceId,
    /// 待发送总量；`None` 表示无限数据
    pub bits: Option<u64>,
    pub start: SimTime,
    pub congestion: CongestionKind,
    pub config: FlowConfig,
}

impl FlowSpec {
    pub fn new(name: impl Into<String>, dest: DeviceId, bits: Option<u64>, start: SimTime) -> Self {
        Self {
            name: name.into(),
            dest,
            bits,
            start,
            congestion: CongestionKind::Aimd,
            config: FlowConfig::default(),
        }
    }

    pub fn with_congestion(mut self, kind: CongestionKind) -> Self {
        self.congestion = kind;
        self
    }

    pub fn with_config(mut self, config: FlowConfig) -> Self {
        self.config = config;
        self
    }
}

/// 收到 ACK 后的结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AckOutcome {
    /// 确认了一个在途包
    New { rtt_secs: f64 },
    /// 不匹配任何在途包；携带该序号目前的重复计数
    Duplicate(u32),
    /// 重复计数恰好达到阈值，已回滚
    FastRecovery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct InFlight {
    bits: u64,
    sent_at: SimTime,
}

/// 一条流
#[derive(Debug)]
pub struct Flow {
    name: String,
    dest: DeviceId,
    start: SimTime,
    total_bits: Option<u64>,
    remaining: Option<u64>,
    next_seq: u64,
    window: Window,
    algorithm: Box<dyn CongestionAlgorithm>,
    outstanding: BTreeMap<u64, InFlight>,
    dup_acks: BTreeMap<u64, u32>,
    cfg: FlowConfig,
    pub tracker: FlowTracker,
}

impl Flow {
    pub fn new(spec: FlowSpec) -> Self {
        let cfg = spec.config;
        let mut window = Window::new(cfg.congestion.initial_window);
        let mut algorithm = spec.congestion.build(&cfg.congestion);
        algorithm.initialize(&mut window, cfg.congestion.initial_ssthresh);

        let mut tracker = FlowTracker::default();
        tracker.record_window(spec.start, window.get());

        Self {
            name: spec.name,
            dest: spec.dest,
            start: spec.start,
            total_bits: spec.bits,
            remaining: spec.bits,
            next_seq: 1,
            window,
            algorithm,
            outstanding: BTreeMap::new(),
            dup_acks: BTreeMap::new(),
            cfg,
            tracker,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dest(&self) -> DeviceId {
        self.dest
    }

    pub fn start(&self) -> SimTime {
        self.start
    }

    pub fn config(&self) -> &FlowConfig {
        &self.cfg
    }

    pub fn window(&self) -> f64 {
        self.window.get()
    }

    pub fn algorithm(&self) -> &dyn CongestionAlgorithm {
        self.algorithm.as_ref()
    }

    pub fn state(&self) -> CongestionState {
        self.algorithm.state()
    }

    pub fn ssthresh(&self) -> f64 {
        self.algorithm.ssthresh()
    }

    /// 下一个将被分配的序号
    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    /// 未确认的包数（即在途集合大小）
    pub fn unacked_count(&self) -> usize {
        self.outstanding.len()
    }

    pub fn is_outstanding(&self, seq: u64) -> bool {
        self.outstanding.contains_key(&seq)
    }

    pub fn total_bits(&self) -> Option<u64> {
        self.total_bits
    }

    /// 剩余待发 bits；`None` 表示无限数据
    pub fn remaining_bits(&self) -> Option<u64> {
        self.remaining
    }

    /// 窗口是否还有空间
    pub fn is_able(&self) -> bool {
        self.window.get() > self.outstanding.len() as f64
    }

    pub fn has_data(&self) -> bool {
        self.remaining.is_none_or(|bits| bits > 0)
    }

    pub fn can_send(&self) -> bool {
        self.is_able() && self.has_data()
    }

    /// 所有数据都已发出并被确认
    pub fn is_complete(&self) -> bool {
        !self.has_data() && self.outstanding.is_empty()
    }

    /// 为即将发送的数据包分配序号、大小与创建时刻，并登记为在途。
    pub fn prepare(&mut self, pkt: &mut Packet, now: SimTime) {
        let bits = match self.remaining {
            Some(left) => left.min(self.cfg.packet_bits),
            None => self.cfg.packet_bits,
        };
        if let Some(left) = &mut self.remaining {
            *left -= bits;
        }

        let seq = self.next_seq;
        self.next_seq += 1;

        pkt.seq = seq;
        pkt.size_bits = bits;
        pkt.created_at = now;
        self.outstanding.insert(seq, InFlight { bits, sent_at: now });

        trace!(flow = %self.name, seq, bits, remaining = ?self.remaining, "分配序号");
    }

    fn rtt_since(&self, now: SimTime) -> SimTime {
        match self.cfg.rtt_window {
            Some(w) => now.saturating_sub(w),
            None => SimTime::ZERO,
        }
    }

    fn rtt_estimate(&self, now: SimTime) -> Option<RttEstimate> {
        let rtt = self.tracker.rtt();
        let min_secs = rtt.min()?;
        let mean_secs = rtt.mean_since(self.rtt_since(now))?;
        Some(RttEstimate { min_secs, mean_secs })
    }

    /// 重传定时器长度：`mean + k·σ`，不小于 `min_timeout`。
    ///
    /// 流自己还没有 RTT 样本时，改用出链路的估计（链路也没有样本时为
    /// `factor × 传播时延`）。
    pub fn timeout(&self, now: SimTime, link: &Link) -> SimTime {
        let policy = &self.cfg.recovery;
        let since = self.rtt_since(now);
        let rtt = self.tracker.rtt();
        let t = match rtt.mean_since(since) {
            Some(mean) => SimTime::from_secs_f64(
                mean + policy.deviation_weight * rtt.variance_since(since).sqrt(),
            ),
            None => link.timeout(since, policy),
        };
        t.max(policy.min_timeout)
    }

    /// 处理一个属于本流的 ACK。
    pub fn on_ack(&mut self, ack: &Packet, now: SimTime) -> AckOutcome {
        if let Some(inflight) = self.outstanding.remove(&ack.seq) {
            let rtt_secs = now.saturating_sub(ack.created_at).as_secs_f64();
            self.tracker.record_acked(now, inflight.bits, rtt_secs);
            let estimate = self.rtt_estimate(now);
            self.algorithm.handle_ack_received(&mut self.window, estimate);
            self.tracker.record_window(now, self.window.get());
            trace!(flow = %self.name, seq = ack.seq, rtt_secs, window = self.window.get(), "确认");
            return AckOutcome::New { rtt_secs };
        }

        let count = {
            let c = self.dup_acks.entry(ack.seq).or_insert(0);
            *c += 1;
            *c
        };
        if count != self.cfg.recovery.dup_ack_threshold {
            return AckOutcome::Duplicate(count);
        }

        debug!(flow = %self.name, seq = ack.seq, count, "🔁 重复 ACK 达到阈值，快速恢复");
        self.algorithm.handle_duplicate_acks(&mut self.window, count);
        self.rollback(ack.seq + 1);
        self.dup_acks.clear();
        self.tracker.record_fast_recovery();
        self.tracker.record_window(now, self.window.get());
        AckOutcome::FastRecovery
    }

    /// 处理重传定时器到期。只有当 `seq` 仍在途且就是定时器对应的那次发送时才生效。
    pub fn on_timeout(&mut self, seq: u64, sent_at: SimTime, now: SimTime) -> bool {
        match self.outstanding.get(&seq) {
            Some(inflight) if inflight.sent_at == sent_at => {}
            _ => return false,
        }

        debug!(flow = %self.name, seq, "⏰ 重传超时，回滚");
        self.algorithm.handle_timeout(&mut self.window);
        self.rollback(seq);
        self.tracker.record_timeout(now);
        self.tracker.record_window(now, self.window.get());
        true
    }

    /// go-back-N：忘掉所有 ≥ boundary 的在途包，归还它们的 bits，
    /// 下一个序号改为 boundary。返回归还的 bits。
    fn rollback(&mut self, boundary: u64) -> u64 {
        if boundary >= self.next_seq {
            return 0;
        }
        let dropped = self.outstanding.split_off(&boundary);
        let bits: u64 = dropped.values().map(|f| f.bits).sum();
        if let Some(left) = &mut self.remaining {
            *left += bits;
        }
        self.next_seq = boundary;
        bits
    }
}
