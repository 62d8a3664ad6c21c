//! 命令链路
//!
//! 对同步命令通道的线程安全包装。协议没有请求 ID，无法交错
//! 应答，所以一把互斥锁包住整个"发送 + 接收"往返；锁的持有
//! 时间就是一次命令往返的时间。

use crate::error::DriverError;
use parking_lot::Mutex;
use pigpio_transport::CommandChannel;
use pigpio_protocol::ids::{CMD_EVM, CMD_NB, CMD_NC, CMD_NP};

/// 线程安全的命令链路（含本连接的通知句柄）
pub(crate) struct CommandLink {
    chan: Mutex<CommandChannel>,
    notify_handle: u32,
}

impl CommandLink {
    pub(crate) fn new(chan: CommandChannel, notify_handle: u32) -> Self {
        Self {
            chan: Mutex::new(chan),
            notify_handle,
        }
    }

    pub(crate) fn notify_handle(&self) -> u32 {
        self.notify_handle
    }

    /// 执行命令，结果字原样返回（BR1/TICK/HWVER 等全宽结果用）
    pub(crate) fn execute_raw(&self, cmd: u32, p1: u32, p2: u32) -> Result<u32, DriverError> {
        Ok(self.chan.lock().execute(cmd, p1, p2)?)
    }

    /// 执行命令，负结果视为守护进程错误
    pub(crate) fn execute(&self, cmd: u32, p1: u32, p2: u32) -> Result<i32, DriverError> {
        let res = self.execute_raw(cmd, p1, p2)? as i32;
        if res < 0 {
            Err(DriverError::daemon(res))
        } else {
            Ok(res)
        }
    }

    /// 执行带扩展负载的命令，负结果视为守护进程错误
    pub(crate) fn execute_ext(
        &self,
        cmd: u32,
        p1: u32,
        p2: u32,
        extents: &[&[u8]],
    ) -> Result<i32, DriverError> {
        let res = self.chan.lock().execute_ext(cmd, p1, p2, extents)? as i32;
        if res < 0 {
            Err(DriverError::daemon(res))
        } else {
            Ok(res)
        }
    }

    /// 推送 GPIO 通知掩码（NB）
    pub(crate) fn push_gpio_mask(&self, mask: u32) -> Result<(), DriverError> {
        self.execute(CMD_NB, self.notify_handle, mask)?;
        Ok(())
    }

    /// 推送事件监控掩码（EVM）
    pub(crate) fn push_event_mask(&self, mask: u32) -> Result<(), DriverError> {
        self.execute(CMD_EVM, self.notify_handle, mask)?;
        Ok(())
    }

    /// 暂停通知（NP）
    pub(crate) fn notify_pause(&self) -> Result<(), DriverError> {
        self.execute(CMD_NP, self.notify_handle, 0)?;
        Ok(())
    }

    /// 关闭通知句柄（NC）
    pub(crate) fn notify_close(&self) -> Result<(), DriverError> {
        self.execute(CMD_NC, self.notify_handle, 0)?;
        Ok(())
    }
}
