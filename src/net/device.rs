//! 设备接口
//!
//! 主机与路由器共同实现的 trait。设备不持有其它实体的引用：
//! 它通过 `Network` 按 id 访问端口、链路与缓冲区，处理结果以新事件的形式返回。

use std::any::Any;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::TopologyError;
use super::id::{DeviceId, PortId};
use super::network::Network;
use crate::sim::Event;

/// 设备种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    Host,
    Router,
}

/// 设备接口
pub trait Device: Any + Send + fmt::Debug {
    /// 获取设备标识符
    fn id(&self) -> DeviceId;

    /// 获取设备名称
    fn name(&self) -> &str;

    fn kind(&self) -> DeviceKind;

    /// 绑定一个新端口（主机最多一个）
    fn attach(&mut self, port: PortId) -> Result<(), TopologyError>;

    /// 仿真开始前调用一次，返回初始事件
    fn initialize(&mut self, net: &mut Network) -> Vec<Event>;

    /// 处理一个发往本设备端口的事件，返回新产生的事件
    fn process(&mut self, ev: Event, net: &mut Network) -> Vec<Event>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}
