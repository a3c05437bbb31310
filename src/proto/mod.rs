//! 传输层/协议模块
//!
//! 流（可靠传输会话）与可插拔的拥塞控制算法（AIMD / FAST）。

mod aimd;
mod congestion;
mod fast;
mod flow;

pub use aimd::Aimd;
pub use congestion::{
    CongestionAlgorithm, CongestionConfig, CongestionKind, CongestionState, Phase, RttEstimate,
    WINDOW_FLOOR, Window,
};
pub use fast::Fast;
pub use flow::{AckOutcome, Flow, FlowConfig, FlowSpec, RecoveryPolicy};
