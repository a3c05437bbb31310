//! 统计追踪器
//!
//! 链路与流各自维护只追加的统计日志，仿真结束后由报告层读取。

mod flow;
mod link;
mod rtt;

pub use flow::FlowTracker;
pub use link::LinkTracker;
pub use rtt::RttStats;

use crate::sim::SimTime;

/// 把 `(时刻, bits)` 日志按 `bin` 分桶，换算为 bit/s。
///
/// 日志须按时间非降序；`bin` 为 0 时返回空序列。
pub(crate) fn rate_series(log: &[(SimTime, u64)], bin: SimTime) -> Vec<(f64, f64)> {
    let (Some(&(last, _)), true) = (log.last(), bin.0 > 0) else {
        return Vec::new();
    };
    let buckets = (last.0 / bin.0) as usize + 1;
    let mut bits = vec![0u64; buckets];
    for &(t, b) in log {
        let idx = (t.0 / bin.0) as usize;
        bits[idx] = bits[idx].saturating_add(b);
    }
    let secs = bin.as_secs_f64();
    bits.into_iter()
        .enumerate()
        .map(|(i, b)| ((i as u64 * bin.0) as f64 / 1e9, b as f64 / secs))
        .collect()
}
