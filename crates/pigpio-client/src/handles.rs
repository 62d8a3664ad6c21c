//! 订阅句柄
//!
//! 注册返回的句柄持有订阅本体的共享引用：取消之后仍可读取最终
//! 的触发计数。取消是显式操作——句柄被丢弃（drop）不会取消订
//! 阅，订阅继续存活在注册表中直到连接停止。

use crate::Result;
use pigpio_driver::{AlertId, AlertRegistry, EventAlert, GpioAlert};
use pigpio_protocol::constants::Edge;
use std::sync::Arc;

/// GPIO 边沿订阅句柄
pub struct AlertHandle {
    registry: Arc<AlertRegistry>,
    alert: Arc<GpioAlert>,
}

impl AlertHandle {
    pub(crate) fn new(registry: Arc<AlertRegistry>, alert: Arc<GpioAlert>) -> Self {
        Self { registry, alert }
    }

    pub fn id(&self) -> AlertId {
        self.alert.id()
    }

    pub fn gpio(&self) -> u8 {
        self.alert.gpio()
    }

    pub fn edge(&self) -> Edge {
        self.alert.edge()
    }

    /// 累计触发次数（看门狗超时也计入）
    pub fn tally(&self) -> u32 {
        self.alert.tally()
    }

    /// 取消订阅
    ///
    /// 只保证停止之后的派发：正在执行的回调会完整结束。若本订阅
    /// 是该 GPIO 上的最后一个，守护进程侧的监控位会同步清除。
    pub fn cancel(self) -> Result<()> {
        self.registry.remove(self.alert.id())
    }
}

/// 事件订阅句柄
pub struct EventHandle {
    registry: Arc<AlertRegistry>,
    alert: Arc<EventAlert>,
}

impl EventHandle {
    pub(crate) fn new(registry: Arc<AlertRegistry>, alert: Arc<EventAlert>) -> Self {
        Self { registry, alert }
    }

    pub fn id(&self) -> AlertId {
        self.alert.id()
    }

    pub fn event(&self) -> u8 {
        self.alert.event()
    }

    pub fn tally(&self) -> u32 {
        self.alert.tally()
    }

    /// 取消订阅（语义同 [`AlertHandle::cancel`]）
    pub fn cancel(self) -> Result<()> {
        self.registry.remove(self.alert.id())
    }
}
