//! Prelude - 常用类型的便捷导入
//!
//! 大多数用户应该使用这个模块来导入常用类型：
//!
//! ```rust
//! use pigpio_sdk::prelude::*;
//! ```

// 客户端层（推荐使用）
pub use crate::client::{AlertHandle, EventHandle, Pigpio};

// 协议层常用枚举
pub use crate::protocol::constants::{Edge, Level, Mode, Pud};

// 驱动层（高级用户使用）
pub use crate::driver::{Connection, ConnectionConfig};

// 回调 trait（实现自定义处理器时需要）
pub use crate::driver::{AlertHandler, EventHandler};

// 错误类型
pub use crate::driver::DriverError;
pub use crate::protocol::ProtocolError;
pub use crate::transport::TransportError;
