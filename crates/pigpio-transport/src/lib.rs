//! # Pigpio Transport Layer
//!
//! 流式 socket 抽象层，提供统一的传输接口。
//!
//! 守护进程的两条通道（同步命令通道、通知通道）都建立在同一种
//! 字节流传输上；[`Transport`] trait 把具体 socket 隐藏在读写原语
//! 之后，上层（命令通道、通知流水线）与测试用的 Mock 传输共用
//! 同一套接口。

use std::time::Duration;
use thiserror::Error;

pub mod command_channel;
pub mod tcp;

#[cfg(any(feature = "mock", test))]
pub mod mock;

pub use command_channel::CommandChannel;
pub use tcp::TcpTransport;

#[cfg(any(feature = "mock", test))]
pub use mock::{MockControl, MockTransport};

/// 传输层统一错误类型
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("read timeout")]
    Timeout,
    #[error("connection closed by peer")]
    Closed,
    #[error("invalid daemon address '{0}'")]
    BadAddress(String),
}

impl TransportError {
    /// 超时以外的错误都视为链路失效
    pub fn is_fatal(&self) -> bool {
        !matches!(self, TransportError::Timeout)
    }
}

/// 字节流传输抽象
///
/// 实现者负责把平台超时错误归一化为 [`TransportError::Timeout`]，
/// 把对端关闭归一化为 [`TransportError::Closed`]——上层的读循环
/// 只区分"超时继续"与"链路失效退出"两种情形。
pub trait Transport: Send {
    /// 发送全部字节（短写由实现内部处理）
    fn send_all(&mut self, buf: &[u8]) -> Result<(), TransportError>;

    /// 接收最多 `buf.len()` 字节，返回实际读到的字节数
    ///
    /// 读超时返回 `Err(Timeout)`；对端关闭返回 `Err(Closed)`，
    /// 永远不以 `Ok(0)` 表达关闭。
    fn recv(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;

    /// 设置读超时（`None` 为阻塞读）
    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<(), TransportError>;
}
