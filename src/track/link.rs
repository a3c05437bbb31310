//! 链路统计
//!
//! 只追加的日志：发送的 bits、丢包时刻、出口缓冲区占用、排队时延与 RTT 样本。
//! 吞吐量、平均排队时延（路由代价）和超时长度都由此导出。

use super::rtt::RttStats;
use super::rate_series;
use crate::sim::SimTime;

#[derive(Debug, Default, Clone)]
pub struct LinkTracker {
    sent: Vec<(SimTime, u64)>,
    losses: Vec<SimTime>,
    occupancy: Vec<(SimTime, u64)>,
    queueing: Vec<(SimTime, f64)>,
    rtt: RttStats,
}

impl LinkTracker {
    pub fn record_sent(&mut self, at: SimTime, bits: u64) {
        self.sent.push((at, bits));
    }

    pub fn record_packet_loss(&mut self, at: SimTime) {
        self.losses.push(at);
    }

    pub fn record_buffer_occupancy(&mut self, at: SimTime, bytes: u64) {
        self.occupancy.push((at, bytes));
    }

    pub fn record_queueing_delay(&mut self, at: SimTime, delay: SimTime) {
        self.queueing.push((at, delay.as_secs_f64()));
    }

    pub fn record_round_trip(&mut self, at: SimTime, rtt_secs: f64) {
        self.rtt.record(at, rtt_secs);
    }

    pub fn rtt(&self) -> &RttStats {
        &self.rtt
    }

    pub fn loss_count(&self) -> usize {
        self.losses.len()
    }

    /// 丢包事件列表（秒）
    pub fn losses(&self) -> Vec<f64> {
        self.losses.iter().map(|t| t.as_secs_f64()).collect()
    }

    /// 出口缓冲区占用序列 `(秒, bytes)`
    pub fn occupancy_series(&self) -> Vec<(f64, f64)> {
        self.occupancy
            .iter()
            .map(|&(t, b)| (t.as_secs_f64(), b as f64))
            .collect()
    }

    /// 经过该链路的流的 RTT 序列 `(秒, 秒)`
    pub fn rtt_series(&self) -> Vec<(f64, f64)> {
        self.rtt
            .samples()
            .iter()
            .map(|&(t, rtt)| (t.as_secs_f64(), rtt))
            .collect()
    }

    pub fn packets_sent(&self) -> usize {
        self.sent.len()
    }

    pub fn bits_sent(&self) -> u64 {
        self.sent.iter().map(|&(_, bits)| bits).sum()
    }

    /// 按 `bin` 分桶的吞吐量序列 `(桶起点秒, bit/s)`
    pub fn throughput_series(&self, bin: SimTime) -> Vec<(f64, f64)> {
        rate_series(&self.sent, bin)
    }

    /// `[since, until)` 内的平均吞吐量（bit/s）
    pub fn throughput(&self, since: SimTime, until: SimTime) -> f64 {
        if until <= since {
            return 0.0;
        }
        let bits: u64 = self
            .sent
            .iter()
            .filter(|&&(t, _)| t >= since && t < until)
            .map(|&(_, bits)| bits)
            .sum();
        bits as f64 / until.saturating_sub(since).as_secs_f64()
    }

    /// `since` 之后的平均排队时延（秒）；没有样本时为 0。
    pub fn mean_queueing_delay(&self, since: SimTime) -> f64 {
        let (sum, n) = self
            .queueing
            .iter()
            .rev()
            .take_while(|&&(t, _)| t >= since)
            .fold((0.0, 0usize), |(sum, n), &(_, d)| (sum + d, n + 1));
        if n == 0 { 0.0 } else { sum / n as f64 }
    }
}
