//! 命令请求/响应编解码
//!
//! 守护进程的命令通道使用固定 16 字节的小端序报文头：
//!
//! ```text
//! +--------+--------+--------+--------+
//! | cmd    | p1     | p2     | p3     |   4 x u32, little-endian
//! +--------+--------+--------+--------+
//! ```
//!
//! `p3` 是扩展负载的字节数，扩展负载紧跟在报文头之后原样发送。
//! 响应同样是 16 字节：前 12 字节回显请求头，最后 4 字节是结果字
//! （按 i32 解释，负值为守护进程错误码）。

use crate::ProtocolError;

/// 命令请求/响应头的字节长度
pub const COMMAND_SIZE: usize = 16;

/// 命令请求头
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandRequest {
    pub cmd: u32,
    pub p1: u32,
    pub p2: u32,
    /// 扩展负载字节数（随 `encode` 写入 p3 字段）
    pub ext_len: u32,
}

impl CommandRequest {
    pub fn new(cmd: u32, p1: u32, p2: u32) -> Self {
        Self {
            cmd,
            p1,
            p2,
            ext_len: 0,
        }
    }

    pub fn with_ext_len(cmd: u32, p1: u32, p2: u32, ext_len: u32) -> Self {
        Self {
            cmd,
            p1,
            p2,
            ext_len,
        }
    }

    /// 编码为 16 字节报文头
    pub fn encode(&self) -> [u8; COMMAND_SIZE] {
        let mut buf = [0u8; COMMAND_SIZE];
        buf[0..4].copy_from_slice(&self.cmd.to_le_bytes());
        buf[4..8].copy_from_slice(&self.p1.to_le_bytes());
        buf[8..12].copy_from_slice(&self.p2.to_le_bytes());
        buf[12..16].copy_from_slice(&self.ext_len.to_le_bytes());
        buf
    }

    /// 从缓冲区解码请求头（守护进程侧/测试用）
    pub fn decode(buf: &[u8]) -> Result<Self, ProtocolError> {
        if buf.len() < COMMAND_SIZE {
            return Err(ProtocolError::ShortBuffer {
                expected: COMMAND_SIZE,
                actual: buf.len(),
            });
        }
        Ok(Self {
            cmd: u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
            p1: u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]),
            p2: u32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]),
            ext_len: u32::from_le_bytes([buf[12], buf[13], buf[14], buf[15]]),
        })
    }
}

/// 命令响应
///
/// 前三个字是请求头的回显（协议没有请求 ID，回显是唯一的对账信息），
/// `res` 是结果字的原始值。负的 i32 含义由调用方按命令语义判定：
/// 多数命令返回状态码，但 BR1/TICK/HWVER 等返回无符号全量值，
/// 高位置位不代表错误。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandResponse {
    pub cmd: u32,
    pub p1: u32,
    pub p2: u32,
    /// 结果字（原始 u32；按需通过 [`CommandResponse::result`] 转 i32）
    pub res: u32,
}

impl CommandResponse {
    /// 从 16 字节缓冲区解码响应
    pub fn decode(buf: &[u8]) -> Result<Self, ProtocolError> {
        if buf.len() < COMMAND_SIZE {
            return Err(ProtocolError::ShortBuffer {
                expected: COMMAND_SIZE,
                actual: buf.len(),
            });
        }
        Ok(Self {
            cmd: u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
            p1: u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]),
            p2: u32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]),
            res: u32::from_le_bytes([buf[12], buf[13], buf[14], buf[15]]),
        })
    }

    /// 编码响应（守护进程侧/测试用）
    pub fn encode(&self) -> [u8; COMMAND_SIZE] {
        let mut buf = [0u8; COMMAND_SIZE];
        buf[0..4].copy_from_slice(&self.cmd.to_le_bytes());
        buf[4..8].copy_from_slice(&self.p1.to_le_bytes());
        buf[8..12].copy_from_slice(&self.p2.to_le_bytes());
        buf[12..16].copy_from_slice(&self.res.to_le_bytes());
        buf
    }

    /// 结果字按二补码解释为 i32
    pub fn result(&self) -> i32 {
        self.res as i32
    }
}
