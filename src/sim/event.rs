//! 仿真事件
//!
//! 事件是一个纯数据元组 `(time, port, action, packet)`：由设备的处理函数产生，
//! 被仿真循环恰好消费一次。

use serde::{Deserialize, Serialize};

use super::time::SimTime;
use crate::net::{Packet, PortId};

/// 事件动作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// 设备希望发起一次发送
    Create,
    /// 把出口缓冲区队头交给链路
    Send,
    /// 数据包到达设备的入口缓冲区
    Receive,
    /// 重传定时器到期
    Timeout,
}

/// 调度事件：在 `at` 时刻由 `port` 所属的设备处理。
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub at: SimTime,
    pub port: PortId,
    pub action: Action,
    pub packet: Packet,
}

impl Event {
    pub fn new(at: SimTime, port: PortId, action: Action, packet: Packet) -> Self {
        Self {
            at,
            port,
            action,
            packet,
        }
    }
}
