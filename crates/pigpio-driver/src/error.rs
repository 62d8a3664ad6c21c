//! 驱动层错误类型定义

use crate::alerts::AlertId;
use pigpio_protocol::{ProtocolError, error_text};
use pigpio_transport::TransportError;
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 传输层错误（连接建立失败、链路中断、命令超时）
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// 协议解析错误
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 守护进程错误码（命令结果字为负，或客户端校验失败）
    #[error("pigpiod error {code}: {}", error_text(*.code))]
    Daemon { code: i32 },

    /// 订阅句柄不存在（已取消或不属于本连接）
    #[error("alert {0:?} not registered")]
    AlertNotFound(AlertId),

    /// 连接已停止（显式 stop 或通知线程因链路失效退出）
    #[error("connection stopped")]
    Stopped,

    /// 通知线程在限定时间内未退出
    #[error("notify thread join timeout")]
    JoinTimeout,
}

impl DriverError {
    /// 构造守护进程错误
    pub fn daemon(code: i32) -> Self {
        DriverError::Daemon { code }
    }

    /// 取出守护进程错误码（其他错误返回 None）
    pub fn daemon_code(&self) -> Option<i32> {
        match self {
            DriverError::Daemon { code } => Some(*code),
            _ => None,
        }
    }
}
