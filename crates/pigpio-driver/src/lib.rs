//! # Pigpio Driver
//!
//! 连接管理与通知解复用引擎。
//!
//! 本 crate 是 SDK 的核心层：
//!
//! - [`Connection`]: 每个守护进程端点一个实例；两阶段建连
//!   （命令 socket → 通知句柄 → 初始快照 → 后台线程）
//! - 通知流水线: 后台线程持续读取 12 字节报文流，按 XOR 差分
//!   还原逐 GPIO 边沿事件，同步派发给订阅
//! - [`AlertRegistry`]: 线程安全的订阅增删，聚合掩码与守护进程
//!   侧始终同步
//!
//! 大多数用户应该使用 `pigpio-client` 的高层 API；本层提供给
//! 需要直接控制命令通道或订阅语义的高级用户。

pub mod alerts;
pub mod config;
pub mod connection;
pub mod context;
pub mod error;

mod link;
mod pipeline;

// 重新导出常用类型
pub use alerts::{AlertHandler, AlertId, AlertRegistry, EventAlert, EventHandler, GpioAlert};
pub use config::ConnectionConfig;
pub use connection::Connection;
pub use context::{ConnContext, LevelSnapshot, MetricsSnapshot};
pub use error::DriverError;
