//! 尾丢弃 FIFO 缓冲区
//!
//! 当剩余容量不足时，直接拒绝新到达的 packet（不入队）。

use std::collections::VecDeque;

use crate::net::Packet;
use crate::sim::SimTime;

/// 排队中的 packet 及其入队时间（用于计算排队时延）。
#[derive(Debug, Clone)]
pub struct Queued {
    pub packet: Packet,
    pub since: SimTime,
}

#[derive(Debug)]
pub struct Buffer {
    max_bytes: u64,
    cur_bytes: u64,
    q: VecDeque<Queued>,
}

impl Buffer {
    pub fn new(max_bytes: u64) -> Self {
        Self {
            max_bytes,
            cur_bytes: 0,
            q: VecDeque::new(),
        }
    }

    /// 是否还能容纳该 packet
    pub fn has_space(&self, pkt: &Packet) -> bool {
        self.cur_bytes.saturating_add(pkt.size_bytes()) <= self.max_bytes
    }

    /// 入队：成功返回 Ok；若被丢弃则返回 Err(pkt)
    pub fn push(&mut self, pkt: Packet, now: SimTime) -> Result<(), Packet> {
        if !self.has_space(&pkt) {
            return Err(pkt);
        }
        self.cur_bytes = self.cur_bytes.saturating_add(pkt.size_bytes());
        self.q.push_back(Queued {
            packet: pkt,
            since: now,
        });
        Ok(())
    }

    /// 出队（FIFO）
    pub fn pop(&mut self) -> Option<Queued> {
        let item = self.q.pop_front()?;
        self.cur_bytes = self.cur_bytes.saturating_sub(item.packet.size_bytes());
        Some(item)
    }

    pub fn peek(&self) -> Option<&Packet> {
        self.q.front().map(|q| &q.packet)
    }

    pub fn len(&self) -> usize {
        self.q.len()
    }

    pub fn is_empty(&self) -> bool {
        self.q.is_empty()
    }

    pub fn bytes(&self) -> u64 {
        self.cur_bytes
    }

    pub fn capacity_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// 调整容量；不会低于当前占用。
    pub(crate) fn set_capacity_bytes(&mut self, max_bytes: u64) {
        self.max_bytes = max_bytes.max(self.cur_bytes);
    }
}
