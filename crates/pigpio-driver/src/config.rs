//! 连接配置
//!
//! 默认地址可由环境变量 `PIGPIO_ADDR` / `PIGPIO_PORT` 覆盖，
//! 与原生 pigpio 客户端使用同一对变量名。

use pigpio_protocol::constants::{
    DEFAULT_ADDR, DEFAULT_PORT, ENV_ADDR, ENV_PORT, KEEPALIVE_INTERVAL_SECS,
};
use std::time::Duration;
use tracing::warn;

/// 连接配置
///
/// # Example
///
/// ```
/// use pigpio_driver::ConnectionConfig;
///
/// // 默认配置（127.0.0.1:8888）
/// let config = ConnectionConfig::default();
///
/// // 环境变量覆盖（PIGPIO_ADDR / PIGPIO_PORT）
/// let config = ConnectionConfig::from_env();
///
/// // 显式指定
/// let config = ConnectionConfig::with_host("192.168.1.10", 8888);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// 守护进程主机名或地址
    pub host: String,
    /// 守护进程端口
    pub port: u16,
    /// 建连超时
    pub connect_timeout: Duration,
    /// 通知 socket 读超时
    ///
    /// 同时决定停止信号的响应粒度：通知线程每次读超时都会检查
    /// 停止标志。
    pub read_timeout: Duration,
    /// keep-alive 窗口：超过该时长没有任何报文即认为链路可疑
    pub keepalive_window: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_ADDR.to_string(),
            port: DEFAULT_PORT,
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_millis(100),
            keepalive_window: Duration::from_secs(KEEPALIVE_INTERVAL_SECS),
        }
    }
}

impl ConnectionConfig {
    /// 读取环境变量覆盖后的默认配置
    ///
    /// 非法的端口值忽略并告警，回落到默认端口。
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var(ENV_ADDR)
            && !addr.is_empty()
        {
            config.host = addr;
        }

        if let Ok(port) = std::env::var(ENV_PORT)
            && !port.is_empty()
        {
            match port.parse::<u16>() {
                Ok(p) => config.port = p,
                Err(_) => warn!("ignoring invalid {}={:?}", ENV_PORT, port),
            }
        }

        config
    }

    /// 指定主机与端口的默认配置
    pub fn with_host(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Self::default()
        }
    }
}
