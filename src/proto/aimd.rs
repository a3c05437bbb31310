//! AIMD（加性增、乘性减）

use super::congestion::{CongestionAlgorithm, CongestionState, Phase, RttEstimate, Window};

#[derive(Debug, Clone, Default)]
pub struct Aimd {
    phase: Phase,
}

impl CongestionAlgorithm for Aimd {
    fn name(&self) -> &'static str {
        "aimd"
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

    fn handle_ack_received(&mut self, window: &mut Window, _rtt: Option<RttEstimate>) {
        match self.phase.state() {
            CongestionState::SlowStart => self.phase.slow_start_ack(window),
            CongestionState::CongestionAvoidance => {
                let w = window.get();
                window.set(w + 1.0 / w);
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
