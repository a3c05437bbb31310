//! RTT 样本统计

use crate::sim::SimTime;

/// 按时间顺序追加的 RTT 样本（秒）。
#[derive(Debug, Default, Clone)]
pub struct RttStats {
    samples: Vec<(SimTime, f64)>,
}

impl RttStats {
    pub fn record(&mut self, at: SimTime, rtt_secs: f64) {
        self.samples.push((at, rtt_secs));
    }

    pub fn samples(&self) -> &[(SimTime, f64)] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn latest(&self) -> Option<f64> {
        self.samples.last().map(|&(_, rtt)| rtt)
    }

    /// 全部样本中的最小 RTT
    pub fn min(&self) -> Option<f64> {
        self.samples
            .iter()
            .map(|&(_, rtt)| rtt)
            .fold(None, |acc, rtt| Some(acc.map_or(rtt, |m: f64| m.min(rtt))))
    }

    fn recent(&self, since: SimTime) -> impl Iterator<Item = f64> + '_ {
        self.samples
            .iter()
            .rev()
            .take_while(move |&&(at, _)| at >= since)
            .map(|&(_, rtt)| rtt)
    }

    /// `since` 之后样本的均值；无样本时返回 None。
    pub fn mean_since(&self, since: SimTime) -> Option<f64> {
        let (sum, n) = self
            .recent(since)
            .fold((0.0, 0usize), |(sum, n), rtt| (sum + rtt, n + 1));
        if n == 0 { None } else { Some(sum / n as f64) }
    }

    /// `since` 之后样本的（总体）方差；无样本时为 0。
    pub fn variance_since(&self, since: SimTime) -> f64 {
        let Some(mean) = self.mean_since(since) else {
            return 0.0;
        };
        let (sum, n) = self.recent(since).fold((0.0, 0usize), |(sum, n), rtt| {
            (sum + (rtt - mean) * (rtt - mean), n + 1)
        });
        if n == 0 { 0.0 } else { sum / n as f64 }
    }
}
