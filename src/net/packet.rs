//! 数据包类型
//!
//! 数据包是内存中的结构（不做序列化）。除寻址与序号外，还携带一个开放的
//! 注解表：ACK 标记、路由协议标签和路由代价表都放在这里。

use std::collections::BTreeMap;

use super::id::DeviceId;
use crate::sim::SimTime;

/// 数据包默认大小（bits）
pub const DATA_PACKET_BITS: u64 = 8_000;
/// ACK 包大小（bits）
pub const ACK_PACKET_BITS: u64 = 512;

/// 注解键
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DataKey {
    /// 存在即表示确认包
    Ack,
    /// 路由协议类型标签
    Protocol,
    /// 路由代价表
    Costs,
}

/// 注解值
#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    Flag(bool),
    Protocol(&'static str),
    Costs(BTreeMap<DeviceId, f64>),
}

/// 网络数据包
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    pub seq: u64,
    pub source: DeviceId,
    pub dest: DeviceId,
    pub size_bits: u64,
    pub created_at: SimTime,
    data: BTreeMap<DataKey, Datum>,
}

impl Packet {
    pub fn new(source: DeviceId, dest: DeviceId, size_bits: u64) -> Self {
        Self {
            seq: 0,
            source,
            dest,
            size_bits,
            created_at: SimTime::ZERO,
            data: BTreeMap::new(),
        }
    }

    /// 构造一个默认大小的数据包
    pub fn data_packet(source: DeviceId, dest: DeviceId) -> Self {
        Self::new(source, dest, DATA_PACKET_BITS)
    }

    /// 构造对本包的确认：源/目的互换，沿用序号与创建时间。
    pub fn ack_for(&self) -> Packet {
        let mut ack = Packet::new(self.dest, self.source, ACK_PACKET_BITS);
        ack.seq = self.seq;
        ack.created_at = self.created_at;
        ack.set_datum(DataKey::Ack, Datum::Flag(true));
        ack
    }

    /// 缓冲区占用（向上取整到字节）
    pub fn size_bytes(&self) -> u64 {
        self.size_bits.div_ceil(8)
    }

    pub fn is_ack(&self) -> bool {
        self.has_datum(DataKey::Ack)
    }

    pub fn has_datum(&self, key: DataKey) -> bool {
        self.data.contains_key(&key)
    }

    pub fn datum(&self, key: DataKey) -> Option<&Datum> {
        self.data.get(&key)
    }

    pub fn set_datum(&mut self, key: DataKey, value: Datum) {
        self.data.insert(key, value);
    }

    /// 路由协议标签（若有）
    pub fn protocol(&self) -> Option<&'static str> {
        match self.data.get(&DataKey::Protocol) {
            Some(Datum::Protocol(tag)) => Some(*tag),
            _ => None,
        }
    }

    /// 携带的路由代价表（若有）
    pub fn costs(&self) -> Option<&BTreeMap<DeviceId, f64>> {
        match self.data.get(&DataKey::Costs) {
            Some(Datum::Costs(costs)) => Some(costs),
            _ => None,
        }
    }
}
