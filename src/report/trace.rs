use serde::{Deserialize, Serialize};

use crate::net::DeviceId;
use crate::sim::{Action, Event};

/// 一条事件轨迹记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEvent {
    /// 仿真时间（纳秒，和 `SimTime.0` 同口径）
    pub t_ns: u64,
    pub port: usize,
    /// 处理该事件的设备
    pub device: usize,
    pub action: Action,
    pub seq: u64,
    pub source: usize,
    pub dest: usize,
    pub size_bits: u64,
    pub ack: bool,
}

impl TraceEvent {
    pub fn from_event(ev: &Event, device: DeviceId) -> Self {
        Self {
            t_ns: ev.at.0,
            port: ev.port.0,
            device: device.0,
            action: ev.action,
            seq: ev.packet.seq,
            source: ev.packet.source.0,
            dest: ev.packet.dest.0,
            size_bits: ev.packet.size_bits,
            ack: ev.packet.is_ack(),
        }
    }
}

/// 一个简单的事件收集器（存内存，仿真结束写 JSON 文件）
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct TraceLogger {
    pub events: Vec<TraceEvent>,
}

impl TraceLogger {
    pub fn push(&mut self, ev: TraceEvent) {
        self.events.push(ev);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
