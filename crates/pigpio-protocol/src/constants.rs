//! 协议常量定义
//!
//! GPIO 电平/边沿/模式/上下拉枚举，通知报文标志位，以及守护进程的默认地址。
//! 数值与 `pigpio.h` 保持一致，枚举转换通过 `num_enum` 完成。

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// 用户 GPIO 的最大编号（bank 1，0-31）
pub const MAX_USER_GPIO: u32 = 31;
/// 全部 GPIO 的最大编号（0-53）
pub const MAX_GPIO: u32 = 53;
/// 事件 ID 的最大值（0-31）
pub const MAX_EVENT: u32 = 31;

/// 看门狗超时的上限（毫秒）
pub const MAX_WDOG_TIMEOUT_MS: u32 = 60_000;

/// 守护进程默认监听地址
pub const DEFAULT_ADDR: &str = "127.0.0.1";
/// 守护进程默认端口
pub const DEFAULT_PORT: u16 = 8888;
/// 覆盖默认地址的环境变量（`PI_ENVADDR`）
pub const ENV_ADDR: &str = "PIGPIO_ADDR";
/// 覆盖默认端口的环境变量（`PI_ENVPORT`）
pub const ENV_PORT: &str = "PIGPIO_PORT";

/// 通知标志位：看门狗超时（低 5 位携带 GPIO 编号）
pub const NTFY_FLAGS_WDOG: u16 = 1 << 5;
/// 通知标志位：keep-alive（无负载，仅链路活性信号）
pub const NTFY_FLAGS_ALIVE: u16 = 1 << 6;
/// 通知标志位：辅助事件（低 5 位携带事件编号）
pub const NTFY_FLAGS_EVENT: u16 = 1 << 7;
/// 标志字低 5 位的 GPIO/事件编号掩码
pub const NTFY_FLAGS_INDEX_MASK: u16 = 31;

/// 守护进程在空闲链路上发送 keep-alive 的周期（秒）。
/// 超过该窗口仍无任何报文到达，应视为链路失效。
pub const KEEPALIVE_INTERVAL_SECS: u64 = 60;

/// 边沿过滤器
///
/// 决定电平变化报文何时触发订阅回调：
/// - `Rising`: 仅 0→1
/// - `Falling`: 仅 1→0
/// - `Either`: 任意方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u32)]
pub enum Edge {
    Rising = 0,
    Falling = 1,
    Either = 2,
}

/// GPIO 电平
///
/// `Timeout` 是看门狗超时的哨兵值，与 0/1 明确区分（`PI_TIMEOUT`）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u32)]
pub enum Level {
    Low = 0,
    High = 1,
    Timeout = 2,
}

impl Level {
    /// 由快照位推导电平（true = 高）
    pub fn from_bit(high: bool) -> Self {
        if high { Level::High } else { Level::Low }
    }

    /// 是否为真实电平（非看门狗哨兵）
    pub fn is_real(&self) -> bool {
        !matches!(self, Level::Timeout)
    }
}

/// GPIO 模式（`PI_INPUT`/`PI_OUTPUT`/`PI_ALT0..5`）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u32)]
pub enum Mode {
    Input = 0,
    Output = 1,
    Alt5 = 2,
    Alt4 = 3,
    Alt0 = 4,
    Alt1 = 5,
    Alt2 = 6,
    Alt3 = 7,
}

/// 上下拉配置（`PI_PUD_OFF`/`PI_PUD_DOWN`/`PI_PUD_UP`）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u32)]
pub enum Pud {
    Off = 0,
    Down = 1,
    Up = 2,
}
