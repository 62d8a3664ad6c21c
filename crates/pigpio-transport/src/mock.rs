//! Mock 传输（测试用）
//!
//! 无守护进程依赖的内存传输：记录所有发出的命令，按脚本回放
//! 接收数据。两种喂数据方式：
//!
//! - `auto_ack`: 每收到一个完整命令（含扩展负载）立即合成一个
//!   16 字节响应，结果字可通过 [`MockControl::set_response`] 按命令
//!   覆盖——模拟一问一答的命令通道。
//! - [`MockControl::queue_bytes`] / [`MockControl::queue_report`]:
//!   手工注入字节块，块边界即 `recv` 的短读边界——模拟通知流的
//!   任意分片到达。

use crate::{Transport, TransportError};
use pigpio_protocol::{COMMAND_SIZE, CommandRequest, CommandResponse, Report};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct MockInner {
    /// 待接收字节块（块边界决定短读边界）
    rx: VecDeque<Vec<u8>>,
    /// 解码出的命令头（cmd, p1, p2, ext_len）
    commands: Vec<(u32, u32, u32, u32)>,
    /// 扩展负载原始字节（所有命令拼接）
    ext_bytes: Vec<u8>,
    /// 按命令覆盖的响应结果字
    responses: HashMap<u32, u32>,
    /// 自动应答模式
    auto_ack: bool,
    /// 已收到头、扩展负载尚未凑齐的命令
    pending_header: Option<CommandRequest>,
    awaiting_ext: usize,
    /// 模拟对端关闭
    closed: bool,
}

impl MockInner {
    fn feed_sent(&mut self, buf: &[u8]) {
        let mut rest = buf;

        while !rest.is_empty() {
            if self.awaiting_ext > 0 {
                let take = rest.len().min(self.awaiting_ext);
                self.ext_bytes.extend_from_slice(&rest[..take]);
                self.awaiting_ext -= take;
                rest = &rest[take..];

                if self.awaiting_ext == 0 {
                    self.finish_command();
                }
                continue;
            }

            // 期望一个完整的 16 字节请求头；CommandChannel 总是整头发送
            let Ok(header) = CommandRequest::decode(rest) else {
                // 非命令字节（不完整的头），全部吞掉
                return;
            };
            rest = &rest[COMMAND_SIZE..];

            self.commands
                .push((header.cmd, header.p1, header.p2, header.ext_len));
            self.awaiting_ext = header.ext_len as usize;
            self.pending_header = Some(header);

            if self.awaiting_ext == 0 {
                self.finish_command();
            }
        }
    }

    fn finish_command(&mut self) {
        let Some(header) = self.pending_header.take() else {
            return;
        };
        if self.auto_ack {
            let res = self.responses.get(&header.cmd).copied().unwrap_or(0);
            let resp = CommandResponse {
                cmd: header.cmd,
                p1: header.p1,
                p2: header.p2,
                res,
            };
            self.rx.push_back(resp.encode().to_vec());
        }
    }
}

/// Mock 传输端（实现 [`Transport`]，交给被测代码）
pub struct MockTransport {
    inner: Arc<Mutex<MockInner>>,
}

/// Mock 控制端（留在测试侧，喂数据、查断言）
#[derive(Clone)]
pub struct MockControl {
    inner: Arc<Mutex<MockInner>>,
}

impl MockTransport {
    /// 创建纯手工脚本的 Mock（`recv` 只返回 `queue_bytes` 注入的数据）
    pub fn new() -> (Self, MockControl) {
        Self::build(false)
    }

    /// 创建自动应答的 Mock（模拟命令通道对端）
    pub fn with_auto_ack() -> (Self, MockControl) {
        Self::build(true)
    }

    fn build(auto_ack: bool) -> (Self, MockControl) {
        let inner = Arc::new(Mutex::new(MockInner {
            auto_ack,
            ..MockInner::default()
        }));
        (
            Self {
                inner: inner.clone(),
            },
            MockControl { inner },
        )
    }
}

impl Transport for MockTransport {
    fn send_all(&mut self, buf: &[u8]) -> Result<(), TransportError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.closed {
            return Err(TransportError::Closed);
        }
        inner.feed_sent(buf);
        Ok(())
    }

    fn recv(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        {
            let mut inner = self.inner.lock().unwrap();

            if let Some(mut chunk) = inner.rx.pop_front() {
                let take = chunk.len().min(buf.len());
                buf[..take].copy_from_slice(&chunk[..take]);
                if take < chunk.len() {
                    chunk.drain(..take);
                    inner.rx.push_front(chunk);
                }
                return Ok(take);
            }

            if inner.closed {
                return Err(TransportError::Closed);
            }
        }

        // 模拟读超时的耗时，避免上层读循环空转
        std::thread::sleep(std::time::Duration::from_millis(1));
        Err(TransportError::Timeout)
    }

    fn set_read_timeout(&mut self, _timeout: Option<std::time::Duration>) -> Result<(), TransportError> {
        Ok(())
    }
}

impl MockControl {
    /// 注入一个接收字节块（独立的短读边界）
    pub fn queue_bytes(&self, bytes: &[u8]) {
        self.inner.lock().unwrap().rx.push_back(bytes.to_vec());
    }

    /// 注入一条完整的通知报文
    pub fn queue_report(&self, report: Report) {
        self.queue_bytes(&report.encode());
    }

    /// 覆盖指定命令的自动应答结果字
    pub fn set_response(&self, cmd: u32, res: u32) {
        self.inner.lock().unwrap().responses.insert(cmd, res);
    }

    /// 模拟对端关闭（队列中剩余数据读完后开始生效）
    pub fn set_closed(&self) {
        self.inner.lock().unwrap().closed = true;
    }

    /// 已发出的命令头（cmd, p1, p2, ext_len）
    pub fn sent_commands(&self) -> Vec<(u32, u32, u32, u32)> {
        self.inner.lock().unwrap().commands.clone()
    }

    /// 指定命令的 (p1, p2) 历史
    pub fn sent_params(&self, cmd: u32) -> Vec<(u32, u32)> {
        self.inner
            .lock()
            .unwrap()
            .commands
            .iter()
            .filter(|(c, ..)| *c == cmd)
            .map(|(_, p1, p2, _)| (*p1, *p2))
            .collect()
    }

    /// 全部扩展负载字节
    pub fn sent_ext_bytes(&self) -> Vec<u8> {
        self.inner.lock().unwrap().ext_bytes.clone()
    }
}
