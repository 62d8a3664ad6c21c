//! # Pigpio SDK - pigpio 守护进程 Rust SDK
//!
//! 通过 pigpiod 的 socket 协议远程控制 Raspberry Pi GPIO。
//!
//! # 架构设计
//!
//! 本 SDK 采用分层架构，从底层到高层：
//!
//! - **协议层** (`protocol`): 命令/通知报文的类型安全编解码
//! - **传输层** (`transport`): 流式 socket 抽象与同步命令通道
//! - **驱动层** (`driver`): 连接管理、通知流水线线程、订阅注册表
//! - **客户端层** (`client`): 面向用户的 GPIO 控制接口
//!
//! # 快速开始
//!
//! 大多数用户应该使用高层 API（客户端接口）：
//!
//! ```no_run
//! use pigpio_sdk::prelude::*;
//!
//! let pi = Pigpio::connect().unwrap();
//! pi.set_mode(17, Mode::Input).unwrap();
//! let cb = pi
//!     .on_edge(17, Edge::Either, |gpio: u8, level: Level, tick: u32| {
//!         println!("gpio {gpio} -> {level:?} @ {tick}");
//!     })
//!     .unwrap();
//! std::thread::sleep(std::time::Duration::from_secs(10));
//! cb.cancel().unwrap();
//! pi.stop().unwrap();
//! ```
//!
//! 需要直接控制命令通道或订阅语义的用户可以使用驱动层：
//!
//! ```no_run
//! use pigpio_sdk::driver::{Connection, ConnectionConfig};
//!
//! let conn = Connection::connect(ConnectionConfig::from_env()).unwrap();
//! ```

// 分层模块（Facade）
pub use pigpio_client as client;
pub use pigpio_driver as driver;
pub use pigpio_protocol as protocol;
pub use pigpio_transport as transport;

// Prelude 模块
pub mod prelude;

// 客户端层（普通用户使用）- 这是推荐的入口点
pub use pigpio_client::{AlertHandle, EventHandle, Pigpio};

// 驱动层常用类型
pub use pigpio_driver::{
    ConnectionConfig, DriverError, LevelSnapshot, MetricsSnapshot,
};

// 协议层常用类型
pub use pigpio_protocol::constants::{Edge, Level, Mode, Pud};
pub use pigpio_protocol::{ProtocolError, Report, ReportKind};

// 传输层错误
pub use pigpio_transport::TransportError;

/// 初始化日志（环境变量 `RUST_LOG` 优先，否则使用给定过滤器）
///
/// 同时桥接 `log` 门面到 `tracing`。重复调用是安全的（后续调用
/// 无效果）。
pub fn init_logging(default_filter: &str) {
    let _ = tracing_log::LogTracer::init();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// 以 `info` 级别初始化日志
pub fn init_default_logging() {
    init_logging("info");
}
