//! 端口：把设备绑定到一条出链路，并配对入口/出口缓冲区。

use super::id::{DeviceId, LinkId};
use crate::queue::Buffer;

#[derive(Debug)]
pub struct Port {
    /// 端口所属设备
    pub device: DeviceId,
    /// 从本端口发出的链路
    pub link: LinkId,
    pub incoming: Buffer,
    pub outgoing: Buffer,
}

impl Port {
    pub fn new(device: DeviceId, link: LinkId, buffer_bytes: u64) -> Self {
        Self {
            device,
            link,
            incoming: Buffer::new(buffer_bytes),
            outgoing: Buffer::new(buffer_bytes),
        }
    }
}
