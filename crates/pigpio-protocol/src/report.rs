//! 通知报文解析
//!
//! 通知 socket 上的数据是固定 12 字节报文的连续字节流（小端序）：
//!
//! ```text
//! +-------+-------+--------+--------+
//! | seqno | flags | tick   | level  |   u16, u16, u32, u32
//! +-------+-------+--------+--------+
//! ```
//!
//! 报文之间没有分隔符或长度前缀，边界完全由固定长度决定——
//! 解复用器必须自行缓冲不完整的读取，凑满 12 字节才能解析。
//!
//! 原始标志位在解码时一次性归类为 [`ReportKind`]，下游只对带标签的
//! 枚举做匹配，不再到处翻看位域。

use crate::ProtocolError;
use crate::constants::{
    NTFY_FLAGS_ALIVE, NTFY_FLAGS_EVENT, NTFY_FLAGS_INDEX_MASK, NTFY_FLAGS_WDOG,
};

/// 单条通知报文的字节长度
pub const REPORT_SIZE: usize = 12;

/// 原始通知报文
///
/// 解码后立即消费，不做持久保存。`tick` 是守护进程侧的微秒计数器
/// （约 71.6 分钟回绕一次），`level` 是 bank 1 全量电平快照。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Report {
    /// 序列号（u16 回绕递增）
    pub seqno: u16,
    /// 标志字（0 = 普通电平变化）
    pub flags: u16,
    /// 微秒时间戳
    pub tick: u32,
    /// bank 1 电平位掩码
    pub level: u32,
}

/// 报文类别（标志位的带标签解码结果）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    /// 普通电平变化：`level` 字段是新的全量快照
    LevelChange,
    /// 看门狗超时：`gpio` 自标志字低 5 位提取，`level` 字段无意义
    Watchdog { gpio: u8 },
    /// keep-alive：仅链路活性信号，不派发
    KeepAlive,
    /// 辅助事件：`event` 自标志字低 5 位提取，事件不携带电平
    Event { event: u8 },
    /// 未知标志组合（更高版本守护进程的扩展），不派发
    Unknown(u16),
}

impl Report {
    /// 从缓冲区头部解码一条报文
    pub fn decode(buf: &[u8]) -> Result<Self, ProtocolError> {
        if buf.len() < REPORT_SIZE {
            return Err(ProtocolError::ShortBuffer {
                expected: REPORT_SIZE,
                actual: buf.len(),
            });
        }
        Ok(Self {
            seqno: u16::from_le_bytes([buf[0], buf[1]]),
            flags: u16::from_le_bytes([buf[2], buf[3]]),
            tick: u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]),
            level: u32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]),
        })
    }

    /// 编码为 12 字节（守护进程侧/测试用）
    pub fn encode(&self) -> [u8; REPORT_SIZE] {
        let mut buf = [0u8; REPORT_SIZE];
        buf[0..2].copy_from_slice(&self.seqno.to_le_bytes());
        buf[2..4].copy_from_slice(&self.flags.to_le_bytes());
        buf[4..8].copy_from_slice(&self.tick.to_le_bytes());
        buf[8..12].copy_from_slice(&self.level.to_le_bytes());
        buf
    }

    /// 归类标志位
    ///
    /// 判定顺序与 `pigpiod_if2` 的派发逻辑一致：flags == 0 为普通
    /// 电平变化，之后依次检查看门狗、keep-alive、事件位。
    pub fn kind(&self) -> ReportKind {
        if self.flags == 0 {
            ReportKind::LevelChange
        } else if self.flags & NTFY_FLAGS_WDOG != 0 {
            ReportKind::Watchdog {
                gpio: (self.flags & NTFY_FLAGS_INDEX_MASK) as u8,
            }
        } else if self.flags & NTFY_FLAGS_ALIVE != 0 {
            ReportKind::KeepAlive
        } else if self.flags & NTFY_FLAGS_EVENT != 0 {
            ReportKind::Event {
                event: (self.flags & NTFY_FLAGS_INDEX_MASK) as u8,
            }
        } else {
            ReportKind::Unknown(self.flags)
        }
    }
}
