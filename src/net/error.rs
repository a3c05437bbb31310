//! 拓扑构建错误
//!
//! 这些错误只会在仿真开始前（构建 arena 时）出现。

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    #[error("unknown device index {0}")]
    UnknownDevice(usize),
    #[error("device `{0}` cannot be connected to itself")]
    SelfLoop(String),
    #[error("link rate must be positive")]
    ZeroRate,
    #[error("host `{0}` already has a port")]
    HostAlreadyConnected(String),
    #[error("device `{0}` is not a host")]
    NotAHost(String),
    #[error("host `{host}` already has a flow to `{dest}`")]
    DuplicateFlow { host: String, dest: String },
}
