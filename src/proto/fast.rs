//! FAST TCP（基于时延的窗口调整）
//!
//! 拥塞避免阶段：
//! `w ← min(2w, (1-γ)w + γ((min_rtt / rtt)·w + α))`，
//! 其余（慢启动、超时、重复 ACK）与 AIMD 相同。

use super::congestion::{CongestionAlgorithm, CongestionState, Phase, RttEstimate, Window};

#[derive(Debug, Clone)]
pub struct Fast {
    phase: Phase,
    gamma: f64,
    alpha: f64,
}

impl Fast {
    pub fn new(gamma: f64, alpha: f64) -> Self {
        Self {
            phase: Phase::default(),
            gamma: if gamma.is_finite() { gamma.clamp(0.0, 1.0) } else { 0.0 },
            alpha: if alpha.is_finite() { alpha.max(0.0) } else { 0.0 },
        }
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    fn rtt_ratio(rtt: Option<RttEstimate>) -> f64 {
        match rtt {
            Some(r) if r.mean_secs > 0.0 && r.min_secs.is_finite() => {
                (r.min_secs / r.mean_secs).clamp(0.0, 1.0)
            }
            _ => 1.0,
        }
    }
}

impl CongestionAlgorithm for Fast {
    fn name(&self) -> &'static str {
        "fast"
    }

    fn state(&self) -> CongestionState {
        self.phase.state()
    }

    fn ssthresh(&self) -> f64 {
        self.phase.ssthresh()
    }

    fn initialize(&mut self, _window: &mut Window, ssthresh: f64) {
        self.phase = Phase::new(ssthresh);
    }

    fn handle_ack_received(&mut self, window: &mut Window, rtt: Option<RttEstimate>) {
        match self.phase.state() {
            CongestionState::SlowStart => self.phase.slow_start_ack(window),
            CongestionState::CongestionAvoidance => {
                let w = window.get();
                let ratio = Self::rtt_ratio(rtt);
                let target = (1.0 - self.gamma) * w + self.gamma * (ratio * w + self.alpha);
                window.set(target.min(2.0 * w));
            }
        }
    }

    fn handle_timeout(&mut self, window: &mut Window) {
        self.phase.timeout(window);
    }

    fn handle_duplicate_acks(&mut self, window: &mut Window, n: u32) {
        self.phase.duplicate_acks(window, n);
    }
}
