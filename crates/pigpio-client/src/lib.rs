//! 客户端接口模块
//!
//! 本模块提供面向用户的 [`Pigpio`] 客户端，包括：
//! - 同步 GPIO 命令（模式/读写/PWM/舵机/看门狗/滤波）
//! - 边沿与事件回调注册（句柄可取消、带触发计数）
//! - 阻塞等待适配器（`wait_for_edge` / `wait_for_event`）
//!
//! # 使用场景
//!
//! 这是大多数用户应该使用的模块。需要直接控制命令通道或订阅
//! 语义的高级用户可以使用 `pigpio-driver`。

pub mod handles;
pub mod pigpio;
mod validate;
mod wait;

// 重新导出常用类型
pub use handles::{AlertHandle, EventHandle};
pub use pigpio::Pigpio;

// 驱动层与协议层的常用类型，客户端代码通常需要它们
pub use pigpio_driver::{
    AlertHandler, AlertId, DriverError, EventHandler, LevelSnapshot, MetricsSnapshot,
};
pub use pigpio_protocol::constants::{Edge, Level, Mode, Pud};

/// 客户端层统一结果类型
pub type Result<T> = std::result::Result<T, DriverError>;
