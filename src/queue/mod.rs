//! 端口缓冲区
//!
//! 每个端口有一个入口和一个出口缓冲区：按字节计容量的 FIFO，带准入控制
//! （尾丢弃）。

mod buffer;

pub use buffer::{Buffer, Queued};
