//! 流统计：窗口、RTT 与确认吞吐量的时间序列。

use super::rtt::RttStats;
use super::rate_series;
use crate::sim::SimTime;

#[derive(Debug, Default, Clone)]
pub struct FlowTracker {
    window: Vec<(SimTime, f64)>,
    rtt: RttStats,
    sent: Vec<(SimTime, u64)>,
    acked: Vec<(SimTime, u64)>,
    timeouts: Vec<SimTime>,
    fast_recoveries: usize,
}

impl FlowTracker {
    pub fn record_window(&mut self, at: SimTime, window: f64) {
        self.window.push((at, window));
    }

    pub fn record_sent(&mut self, at: SimTime, bits: u64) {
        self.sent.push((at, bits));
    }

    pub fn record_acked(&mut self, at: SimTime, bits: u64, rtt_secs: f64) {
        self.acked.push((at, bits));
        self.rtt.record(at, rtt_secs);
    }

    pub fn record_timeout(&mut self, at: SimTime) {
        self.timeouts.push(at);
    }

    pub fn record_fast_recovery(&mut self) {
        self.fast_recoveries += 1;
    }

    pub fn rtt(&self) -> &RttStats {
        &self.rtt
    }

    pub fn packets_sent(&self) -> usize {
        self.sent.len()
    }

    pub fn packets_acked(&self) -> usize {
        self.acked.len()
    }

    pub fn bits_acked(&self) -> u64 {
        self.acked.iter().map(|&(_, bits)| bits).sum()
    }

    pub fn timeouts(&self) -> usize {
        self.timeouts.len()
    }

    pub fn fast_recoveries(&self) -> usize {
        self.fast_recoveries
    }

    /// 窗口序列 `(秒, 包数)`
    pub fn window_series(&self) -> Vec<(f64, f64)> {
        self.window
            .iter()
            .map(|&(t, w)| (t.as_secs_f64(), w))
            .collect()
    }

    /// RTT 序列 `(秒, 秒)`
    pub fn rtt_series(&self) -> Vec<(f64, f64)> {
        self.rtt
            .samples()
            .iter()
            .map(|&(t, rtt)| (t.as_secs_f64(), rtt))
            .collect()
    }

    /// 按确认到达时刻统计的吞吐量 `(桶起点秒, bit/s)`
    pub fn throughput_series(&self, bin: SimTime) -> Vec<(f64, f64)> {
        rate_series(&self.acked, bin)
    }
}
