//! 仿真器
//!
//! 定义事件驱动仿真器：持有网络（设备/端口/链路的 arena）与全局事件队列。

use super::event::Event;
use super::scheduled_event::ScheduledEvent;
use super::time::SimTime;
use crate::net::Network;
use crate::report::{TraceEvent, TraceLogger};
use std::collections::BinaryHeap;
use tracing::{debug, info, trace};

/// 事件驱动仿真：维护当前时间、事件队列与网络。
pub struct Simulation {
    net: Network,
    now: SimTime,
    next_seq: u64,
    q: BinaryHeap<ScheduledEvent>,
    initialized: bool,
    processed: u64,
    /// 可选的事件轨迹（每个被处理的事件记录一条）
    pub trace: Option<TraceLogger>,
}

impl Simulation {
    pub fn new(net: Network) -> Self {
        Self {
            net,
            now: SimTime::ZERO,
            next_seq: 0,
            q: BinaryHeap::new(),
            initialized: false,
            processed: 0,
            trace: None,
        }
    }

    /// 获取当前仿真时间
    pub fn now(&self) -> SimTime {
        self.now
    }

    pub fn network(&self) -> &Network {
        &self.net
    }

    pub fn network_mut(&mut self) -> &mut Network {
        &mut self.net
    }

    pub fn into_network(self) -> Network {
        self.net
    }

    /// 已处理的事件总数
    pub fn processed_events(&self) -> u64 {
        self.processed
    }

    /// 队列中尚未处理的事件数
    pub fn pending_events(&self) -> usize {
        self.q.len()
    }

    /// 开启事件轨迹记录
    pub fn enable_trace(&mut self) {
        if self.trace.is_none() {
            self.trace = Some(TraceLogger::default());
        }
    }

    /// 调度事件；早于当前时间的事件会被推迟到当前时间。
    #[tracing::instrument(skip(self, ev), fields(action = ?ev.action, port = ?ev.port, schedule_at = ?ev.at))]
    pub fn schedule(&mut self, mut ev: Event) {
        if ev.at < self.now {
            debug!(now = ?self.now, "事件时间早于当前时间，推迟到当前时间");
            ev.at = self.now;
        }
        let seq = self.next_seq;
        trace!(now = ?self.now, seq, "调度事件");

        self.next_seq = self.next_seq.wrapping_add(1);
        self.q.push(ScheduledEvent { at: ev.at, seq, ev });
    }

    /// 初始化所有设备并收集它们产生的初始事件（只执行一次）。
    fn initialize(&mut self) {
        if self.initialized {
            return;
        }
        self.initialized = true;

        let ids: Vec<_> = self.net.device_ids().collect();
        for id in ids {
            let events = self.net.initialize_device(id);
            debug!(device = %self.net.name(id), events = events.len(), "设备初始化完成");
            for ev in events {
                self.schedule(ev);
            }
        }
    }

    fn dispatch(&mut self, item: ScheduledEvent) {
        self.now = item.at;
        self.processed += 1;

        let ScheduledEvent { seq, ev, .. } = item;
        trace!(
            event_num = self.processed,
            now = ?self.now,
            seq,
            action = ?ev.action,
            port = ?ev.port,
            remaining_queue = self.q.len(),
            "执行事件"
        );

        if let Some(t) = &mut self.trace {
            let device = self.net.port(ev.port).device;
            t.push(TraceEvent::from_event(&ev, device));
        }

        for spawned in self.net.dispatch(ev) {
            self.schedule(spawned);
        }
    }

    /// 运行直到事件队列为空或下一个事件晚于 `until`。
    pub fn run_until(&mut self, until: SimTime) {
        self.initialize();
        while let Some(top) = self.q.peek() {
            if top.at > until {
                break;
            }
            let Some(item) = self.q.pop() else {
                break;
            };
            self.dispatch(item);
        }
        self.now = self.now.max(until);
    }

    /// 运行所有事件直到队列为空。
    #[tracing::instrument(skip(self))]
    pub fn run(&mut self) {
        info!("▶️  开始运行仿真");
        self.initialize();
        debug!(now = ?self.now, queue_size = self.q.len(), "初始状态");

        while let Some(item) = self.q.pop() {
            self.dispatch(item);
        }

        info!(
            total_events = self.processed,
            final_time = ?self.now,
            "✅ 仿真完成"
        );
    }
}
