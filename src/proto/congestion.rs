//! 拥塞控制接口
//!
//! 两个状态（慢启动 / 拥塞避免）的状态机，按 ACK、超时与重复 ACK 修改流的窗口。
//! 这是稳态控制回路：所有非正或非有限的结果都被夹到下限，而不是报错。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::aimd::Aimd;
use super::fast::Fast;

/// 窗口下限（包数）
pub const WINDOW_FLOOR: f64 = 1e-3;

fn clamp_floor(v: f64, floor: f64) -> f64 {
    if v.is_finite() && v >= floor { v } else { floor }
}

/// 拥塞窗口（包数，浮点），始终 ≥ `WINDOW_FLOOR`。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window(f64);

impl Window {
    pub fn new(size: f64) -> Self {
        Window(clamp_floor(size, WINDOW_FLOOR))
    }

    pub fn get(self) -> f64 {
        self.0
    }

    pub fn set(&mut self, size: f64) {
        self.0 = clamp_floor(size, WINDOW_FLOOR);
    }
}

/// 拥塞控制阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CongestionState {
    SlowStart,
    CongestionAvoidance,
}

/// 拥塞控制参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CongestionConfig {
    /// 初始窗口（包数）
    pub initial_window: f64,
    /// 初始慢启动阈值（包数）
    pub initial_ssthresh: f64,
    /// FAST 的平滑系数 γ ∈ (0, 1]
    pub gamma: f64,
    /// FAST 的目标排队包数 α
    pub alpha: f64,
}

impl Default for CongestionConfig {
    fn default() -> Self {
        Self {
            initial_window: 1.0,
            initial_ssthresh: 32.0,
            gamma: 0.1,
            alpha: 50.0,
        }
    }
}

/// FAST 使用的 RTT 估计（秒）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RttEstimate {
    pub min_secs: f64,
    pub mean_secs: f64,
}

/// 拥塞控制算法。每个实例只绑定一个流，窗口由流传入。
pub trait CongestionAlgorithm: fmt::Debug + Send {
    fn name(&self) -> &'static str;

    fn state(&self) -> CongestionState;

    fn ssthresh(&self) -> f64;

    /// 绑定到流：设置阈值并进入慢启动
    fn initialize(&mut self, window: &mut Window, ssthresh: f64);

    fn handle_ack_received(&mut self, window: &mut Window, rtt: Option<RttEstimate>);

    fn handle_timeout(&mut self, window: &mut Window);

    fn handle_duplicate_acks(&mut self, window: &mut Window, n: u32);
}

/// AIMD 与 FAST 共享的阶段状态：慢启动增长、超时与重复 ACK 的处理完全相同。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Phase {
    state: CongestionState,
    ssthresh: f64,
}

impl Default for Phase {
    fn default() -> Self {
        Phase::new(CongestionConfig::default().initial_ssthresh)
    }
}

impl Phase {
    pub fn new(ssthresh: f64) -> Self {
        Self {
            state: CongestionState::SlowStart,
            ssthresh: clamp_floor(ssthresh, 0.0),
        }
    }

    pub fn state(&self) -> CongestionState {
        self.state
    }

    pub fn ssthresh(&self) -> f64 {
        self.ssthresh
    }

    /// 慢启动：每个 ACK 窗口 +1，到达阈值后转入拥塞避免。
    pub(crate) fn slow_start_ack(&mut self, window: &mut Window) {
        window.set(window.get() + 1.0);
        if window.get() >= self.ssthresh {
            self.state = CongestionState::CongestionAvoidance;
        }
    }

    pub(crate) fn timeout(&mut self, window: &mut Window) {
        self.ssthresh = (window.get() / 2.0).max(1.0);
        window.set(1.0);
        self.state = CongestionState::SlowStart;
    }

    /// 拥塞避免阶段的快速恢复：窗口减半（不低于 1），再按重复 ACK 数膨胀。
    pub(crate) fn duplicate_acks(&mut self, window: &mut Window, n: u32) {
        if self.state != CongestionState::CongestionAvoidance {
            return;
        }
        let half = (window.get() / 2.0).max(1.0);
        self.ssthresh = half;
        window.set(half + n as f64);
    }
}

/// 拥塞控制算法种类（配置文件中的标签）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CongestionKind {
    Aimd,
    Fast,
}

impl CongestionKind {
    pub fn build(self, cfg: &CongestionConfig) -> Box<dyn CongestionAlgorithm> {
        match self {
            CongestionKind::Aimd => Box::new(Aimd::default()),
            CongestionKind::Fast => Box::new(Fast::new(cfg.gamma, cfg.alpha)),
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            CongestionKind::Aimd => "aimd",
            CongestionKind::Fast => "fast",
        }
    }
}

impl FromStr for CongestionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aimd" | "reno" => Ok(CongestionKind::Aimd),
            "fast" => Ok(CongestionKind::Fast),
            other => Err(other.to_string()),
        }
    }
}
