//! 进程内伪守护进程
//!
//! 在真实 TCP 上模拟 pigpiod 的命令语义：接受任意数量的连接，
//! 每条连接上解析 16 字节命令并回显应答；收到 NOIB 的连接被标记
//! 为通知流，测试侧可以往上面写报文（支持任意字节切分，用来验证
//! 客户端的流重组）。

use pigpio_sdk::protocol::ids::*;
use pigpio_sdk::protocol::{COMMAND_SIZE, CommandRequest, CommandResponse, Report};
use std::collections::HashMap;
use std::io::{ErrorKind, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

#[derive(Default)]
struct DaemonInner {
    /// 已打开的通知流（NOIB 所在连接的写端克隆）
    notify_streams: Vec<TcpStream>,
    /// NB 推送历史（mask）
    nb_masks: Vec<u32>,
    /// EVM 推送历史（mask）
    evm_masks: Vec<u32>,
    /// NC 调用次数
    nc_calls: u32,
    /// 全部命令历史（cmd, p1, p2）
    commands: Vec<(u32, u32, u32)>,
    /// 按命令覆盖的应答结果字
    responses: HashMap<u32, u32>,
    /// BR1 应答的初始快照
    initial_levels: u32,
    /// 下一个通知句柄
    next_handle: u32,
}

/// 伪守护进程
pub struct FakeDaemon {
    port: u16,
    inner: Arc<Mutex<DaemonInner>>,
    stop: Arc<AtomicBool>,
    accept_thread: Option<JoinHandle<()>>,
}

impl FakeDaemon {
    pub fn spawn() -> Self {
        Self::spawn_with_levels(0)
    }

    /// 以给定的初始 bank 1 快照启动
    pub fn spawn_with_levels(initial_levels: u32) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind fake daemon");
        let port = listener.local_addr().unwrap().port();
        listener.set_nonblocking(true).unwrap();

        let inner = Arc::new(Mutex::new(DaemonInner {
            initial_levels,
            next_handle: 1,
            ..DaemonInner::default()
        }));
        let stop = Arc::new(AtomicBool::new(false));

        let accept_inner = inner.clone();
        let accept_stop = stop.clone();
        let accept_thread = std::thread::spawn(move || {
            loop {
                if accept_stop.load(Ordering::Relaxed) {
                    break;
                }
                match listener.accept() {
                    Ok((sock, _)) => {
                        sock.set_nodelay(true).ok();
                        sock.set_read_timeout(Some(Duration::from_millis(50))).ok();
                        let conn_inner = accept_inner.clone();
                        let conn_stop = accept_stop.clone();
                        // 每条连接一个处理线程；socket 关闭或 stop 置位后退出
                        std::thread::spawn(move || {
                            handle_connection(sock, conn_inner, conn_stop);
                        });
                    },
                    Err(e) if e.kind() == ErrorKind::WouldBlock => {
                        std::thread::sleep(Duration::from_millis(10));
                    },
                    Err(_) => break,
                }
            }
        });

        Self {
            port,
            inner,
            stop,
            accept_thread: Some(accept_thread),
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// 按命令覆盖应答结果字
    pub fn set_response(&self, cmd: u32, res: u32) {
        self.inner.lock().unwrap().responses.insert(cmd, res);
    }

    /// 向所有通知流写一条完整报文
    pub fn send_report(&self, report: Report) {
        self.send_bytes(&report.encode());
    }

    /// 向所有通知流写任意字节（测试部分写/粘包）
    pub fn send_bytes(&self, bytes: &[u8]) {
        let mut inner = self.inner.lock().unwrap();
        inner.notify_streams.retain_mut(|s| {
            s.write_all(bytes).and_then(|_| s.flush()).is_ok()
        });
    }

    /// 通知流是否已经建立（NOIB 已处理）
    pub fn notify_stream_ready(&self) -> bool {
        !self.inner.lock().unwrap().notify_streams.is_empty()
    }

    pub fn nb_masks(&self) -> Vec<u32> {
        self.inner.lock().unwrap().nb_masks.clone()
    }

    pub fn evm_masks(&self) -> Vec<u32> {
        self.inner.lock().unwrap().evm_masks.clone()
    }

    pub fn nc_calls(&self) -> u32 {
        self.inner.lock().unwrap().nc_calls
    }

    /// 指定命令的 (p1, p2) 历史
    pub fn commands_of(&self, cmd: u32) -> Vec<(u32, u32)> {
        self.inner
            .lock()
            .unwrap()
            .commands
            .iter()
            .filter(|(c, ..)| *c == cmd)
            .map(|(_, p1, p2)| (*p1, *p2))
            .collect()
    }
}

impl Drop for FakeDaemon {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.accept_thread.take() {
            let _ = handle.join();
        }
    }
}

/// 读满 `buf`；超时继续（检查 stop），对端关闭返回 false
fn read_full(
    sock: &mut TcpStream,
    buf: &mut [u8],
    stop: &AtomicBool,
) -> bool {
    let mut got = 0usize;
    while got < buf.len() {
        if stop.load(Ordering::Relaxed) {
            return false;
        }
        match sock.read(&mut buf[got..]) {
            Ok(0) => return false,
            Ok(n) => got += n,
            Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut => {
                continue;
            },
            Err(_) => return false,
        }
    }
    true
}

fn handle_connection(mut sock: TcpStream, inner: Arc<Mutex<DaemonInner>>, stop: Arc<AtomicBool>) {
    let mut header = [0u8; COMMAND_SIZE];

    loop {
        if !read_full(&mut sock, &mut header, &stop) {
            break;
        }
        let Ok(request) = CommandRequest::decode(&header) else {
            break;
        };

        // 吞掉扩展负载
        if request.ext_len > 0 {
            let mut ext = vec![0u8; request.ext_len as usize];
            if !read_full(&mut sock, &mut ext, &stop) {
                break;
            }
        }

        let res = {
            let mut state = inner.lock().unwrap();
            state.commands.push((request.cmd, request.p1, request.p2));

            if let Some(res) = state.responses.get(&request.cmd).copied() {
                res
            } else {
                match request.cmd {
                    CMD_NOIB => {
                        let handle = state.next_handle;
                        state.next_handle += 1;
                        if let Ok(clone) = sock.try_clone() {
                            state.notify_streams.push(clone);
                        }
                        handle
                    },
                    CMD_BR1 => state.initial_levels,
                    CMD_NB => {
                        state.nb_masks.push(request.p2);
                        0
                    },
                    CMD_EVM => {
                        state.evm_masks.push(request.p2);
                        0
                    },
                    CMD_NC => {
                        state.nc_calls += 1;
                        0
                    },
                    _ => 0,
                }
            }
        };

        let response = CommandResponse {
            cmd: request.cmd,
            p1: request.p1,
            p2: request.p2,
            res,
        };
        if sock.write_all(&response.encode()).is_err() {
            break;
        }
    }
}
