//! # Pigpio Protocol
//!
//! pigpio 守护进程 socket 协议定义（无 I/O 依赖）
//!
//! ## 模块
//!
//! - `ids`: 命令 ID 常量定义
//! - `constants`: 电平/边沿/模式枚举与通知标志位
//! - `command`: 命令请求/响应编解码（固定 16 字节头）
//! - `report`: 通知报文解析（固定 12 字节，带标签归类）
//! - `errors`: 守护进程错误码表
//!
//! ## 字节序
//!
//! 协议全部使用小端序（little-endian）。命令通道与通知通道是两种
//! 独立的报文格式，分别见 [`command`] 与 [`report`] 模块。

pub mod command;
pub mod constants;
pub mod errors;
pub mod ids;
pub mod report;

// 重新导出常用类型
pub use command::{COMMAND_SIZE, CommandRequest, CommandResponse};
pub use constants::*;
pub use errors::error_text;
pub use report::{REPORT_SIZE, Report, ReportKind};

use thiserror::Error;

/// 协议解析错误类型
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("buffer too short: expected {expected} bytes, got {actual}")]
    ShortBuffer { expected: usize, actual: usize },

    #[error("invalid value for field {field}: {value}")]
    InvalidValue { field: &'static str, value: u32 },
}
