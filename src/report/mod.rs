//! 仿真结果输出
//!
//! - 事件轨迹：每个被处理的事件一条 JSON 记录，可用于回放和逐条比较两次运行；
//! - 运行报告：流与链路的时间序列、丢包、路由表和全局计数器。

mod trace;
mod types;

pub use trace::{TraceEvent, TraceLogger};
pub use types::{DeviceInfo, FlowReport, LinkReport, Report, RouteEntry, RoutingReport};
