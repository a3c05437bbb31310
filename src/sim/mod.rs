//! 仿真核心模块
//!
//! 此模块包含事件驱动仿真的核心组件：仿真时间、事件、调度队列和仿真循环。

// 子模块声明
mod event;
mod scheduled_event;
mod simulator;
mod time;

// 重新导出公共接口
pub use event::{Action, Event};
pub use scheduled_event::ScheduledEvent;
pub use simulator::Simulation;
pub use time::SimTime;
