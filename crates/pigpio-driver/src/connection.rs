//! 连接对象
//!
//! 一个 [`Connection`] 对应一个守护进程端点，持有：命令 socket
//! （互斥串行的一问一答通道）、专用通知 socket（整体移交给后台
//! 线程）、订阅注册表。显式实例，无进程级单例——多个独立连接
//! 可以并存，互不共享任何静态状态。
//!
//! ## 建连时序
//!
//! 建连是两阶段的显式序列，对调用方表现为一次原子的 `connect`：
//!
//! 1. 打开命令 socket
//! 2. 打开专用通知 socket，在其上发送 NOIB 取得通知句柄
//! 3. 经命令通道执行 BR1，取得初始电平快照
//! 4. 启动通知线程（快照作为差分基准传入）
//!
//! 任何一步失败都直接返回错误，不会留下半启动的线程；注册表在
//! `connect` 返回之前不可达，不存在"线程尚未存在就推送掩码"的
//! 窗口。

use crate::alerts::AlertRegistry;
use crate::config::ConnectionConfig;
use crate::context::{ConnContext, LevelSnapshot, MetricsSnapshot};
use crate::error::DriverError;
use crate::link::CommandLink;
use crate::pipeline::notify_loop;
use parking_lot::Mutex;
use pigpio_protocol::ids::{CMD_BR1, CMD_NOIB};
use pigpio_transport::{CommandChannel, TcpTransport, Transport};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{JoinHandle, spawn};
use std::time::Duration;
use tracing::{debug, info, warn};

/// 等待通知线程退出的上限
const JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// 带超时的线程 join 扩展 trait
trait JoinTimeout {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()>;
}

impl<T: Send + 'static> JoinTimeout for JoinHandle<T> {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()> {
        use std::sync::mpsc;

        let (tx, rx) = mpsc::channel();

        // 看护线程代为 join，结果经通道送回
        spawn(move || {
            let result = self.join();
            let _ = tx.send(result);
        });

        match rx.recv_timeout(timeout) {
            Ok(join_result) => join_result.map(|_| ()),
            Err(mpsc::RecvTimeoutError::Timeout) => {
                // 超时：看护线程继续等待，进程退出时由 OS 清理
                Err(Box::new(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "thread join timeout",
                )))
            },
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(Box::new(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "thread panicked during join",
            ))),
        }
    }
}

/// 到守护进程的连接
///
/// # 示例
///
/// ```no_run
/// use pigpio_driver::{Connection, ConnectionConfig};
///
/// let conn = Connection::connect(ConnectionConfig::from_env()).unwrap();
/// let levels = conn.levels();
/// println!("bank 1: {:#010x}", levels.levels);
/// conn.stop().unwrap();
/// ```
pub struct Connection {
    link: Arc<CommandLink>,
    registry: Arc<AlertRegistry>,
    ctx: Arc<ConnContext>,
    stop: Arc<AtomicBool>,
    notify_thread: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("stopped", &self.stop.load(std::sync::atomic::Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// 建立到守护进程的连接（TCP）
    ///
    /// # 错误
    /// - `Transport`: socket 建立失败（连接对象不会创建，没有后台
    ///   线程残留）
    /// - `Daemon`: NOIB 被拒（如句柄耗尽）
    pub fn connect(config: ConnectionConfig) -> Result<Self, DriverError> {
        let cmd = TcpTransport::connect(&config.host, config.port, config.connect_timeout)?;
        let notify = TcpTransport::connect(&config.host, config.port, config.connect_timeout)?;
        info!("connecting to pigpiod at {}:{}", config.host, config.port);
        Self::connect_with(Box::new(cmd), Box::new(notify), config)
    }

    /// 用现成的传输建立连接
    ///
    /// 供测试（Mock 传输）与自定义传输使用；建连时序与
    /// [`Connection::connect`] 完全相同。
    pub fn connect_with(
        cmd: Box<dyn Transport>,
        mut notify: Box<dyn Transport>,
        config: ConnectionConfig,
    ) -> Result<Self, DriverError> {
        // 1. 在通知 socket 上握手取得句柄；之后该 socket 上只有报文流
        notify.set_read_timeout(Some(config.connect_timeout))?;
        let mut noib_chan = CommandChannel::new(notify);
        let handle = noib_chan.execute(CMD_NOIB, 0, 0)? as i32;
        if handle < 0 {
            return Err(DriverError::daemon(handle));
        }
        let mut notify = noib_chan.into_inner();
        debug!("notification handle {} opened", handle);

        // 2. 命令链路就绪后，先拉初始快照，再启动线程。
        //    顺序不可颠倒：线程先跑起来的话，首条差分会把所有
        //    当前为高的 GPIO 误报成上升沿。
        let link = Arc::new(CommandLink::new(CommandChannel::new(cmd), handle as u32));
        let initial_level = link.execute_raw(CMD_BR1, 0, 0)?;
        debug!("initial bank 1 snapshot: {:#010x}", initial_level);

        let ctx = Arc::new(ConnContext::new(LevelSnapshot {
            tick: 0,
            levels: initial_level,
        }));
        let registry = Arc::new(AlertRegistry::new(link.clone()));
        let stop = Arc::new(AtomicBool::new(false));

        // 3. 启动通知线程
        notify.set_read_timeout(Some(config.read_timeout))?;
        let thread_registry = registry.clone();
        let thread_ctx = ctx.clone();
        let thread_stop = stop.clone();
        let keepalive_window = config.keepalive_window;
        let notify_thread = std::thread::Builder::new()
            .name("pigpio-notify".into())
            .spawn(move || {
                notify_loop(
                    notify,
                    thread_registry,
                    thread_ctx,
                    thread_stop,
                    initial_level,
                    keepalive_window,
                );
            })
            .map_err(|e| DriverError::Transport(e.into()))?;

        Ok(Self {
            link,
            registry,
            ctx,
            stop,
            notify_thread: Mutex::new(Some(notify_thread)),
        })
    }

    /// 订阅注册表
    pub fn registry(&self) -> &Arc<AlertRegistry> {
        &self.registry
    }

    /// 本连接的通知句柄
    pub fn notify_handle(&self) -> u32 {
        self.link.notify_handle()
    }

    /// 电平快照（无锁）
    pub fn levels(&self) -> LevelSnapshot {
        self.ctx.levels()
    }

    /// 通知链路计数器快照
    pub fn metrics(&self) -> MetricsSnapshot {
        self.ctx.metrics()
    }

    /// 距最近一次报文的时长
    pub fn last_report_age(&self) -> Duration {
        self.ctx.last_report_age()
    }

    /// 连接是否存活（未停止，且通知线程仍在运行）
    pub fn is_alive(&self) -> bool {
        if self.stop.load(Ordering::Acquire) {
            return false;
        }
        self.notify_thread
            .lock()
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    fn ensure_alive(&self) -> Result<(), DriverError> {
        if self.stop.load(Ordering::Acquire) {
            Err(DriverError::Stopped)
        } else {
            Ok(())
        }
    }

    /// 执行命令，负结果视为守护进程错误
    pub fn command(&self, cmd: u32, p1: u32, p2: u32) -> Result<i32, DriverError> {
        self.ensure_alive()?;
        self.link.execute(cmd, p1, p2)
    }

    /// 执行命令，结果字原样返回（BR1/TICK/HWVER 等全宽结果用）
    pub fn command_raw(&self, cmd: u32, p1: u32, p2: u32) -> Result<u32, DriverError> {
        self.ensure_alive()?;
        self.link.execute_raw(cmd, p1, p2)
    }

    /// 执行带扩展负载的命令
    pub fn command_ext(
        &self,
        cmd: u32,
        p1: u32,
        p2: u32,
        extents: &[&[u8]],
    ) -> Result<i32, DriverError> {
        self.ensure_alive()?;
        self.link.execute_ext(cmd, p1, p2, extents)
    }

    /// 暂停通知转发（NP；订阅保持注册，掩码留在注册表中）
    pub fn pause_notifications(&self) -> Result<(), DriverError> {
        self.ensure_alive()?;
        self.link.notify_pause()
    }

    /// 恢复通知转发（重新推送注册表当前掩码）
    pub fn resume_notifications(&self) -> Result<(), DriverError> {
        self.ensure_alive()?;
        self.registry.resync()
    }

    /// 停止连接
    ///
    /// 幂等。置位停止标志，尽力发送 NC 关闭通知句柄，然后在限定
    /// 时间内等待通知线程退出。停止是协作式的：正在执行的用户
    /// 回调不会被打断。
    pub fn stop(&self) -> Result<(), DriverError> {
        if self.stop.swap(true, Ordering::AcqRel) {
            // 已停止（显式 stop 过，或通知线程因链路失效自行退出）
            return Ok(());
        }

        // 尽力关闭守护进程侧的句柄；链路已死时失败是预期内的
        if let Err(e) = self.link.notify_close() {
            warn!("failed to close notification handle: {}", e);
        }

        let handle = self.notify_thread.lock().take();
        if let Some(handle) = handle {
            // 线程最迟在下一次读超时看到停止标志
            if handle.join_timeout(JOIN_TIMEOUT).is_err() {
                return Err(DriverError::JoinTimeout);
            }
        }

        info!("connection stopped");
        Ok(())
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
