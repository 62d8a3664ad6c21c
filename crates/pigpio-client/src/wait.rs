//! 阻塞等待适配器
//!
//! `wait_for_edge` / `wait_for_event` 是回调订阅之上的同步外壳：
//! 注册一个只置标志位的临时订阅，以 50ms 粒度轮询标志直到触发或
//! 超时，两条路径都先注销订阅再返回。
//!
//! **精度说明**：返回时机受轮询粒度限制（最多晚一个轮询周期），
//! 只适合"有没有等到"的判定。需要微秒级时间戳的场景必须直接使
//! 用回调形式（[`crate::Pigpio::on_edge`]），从回调参数里取 `tick`。

use crate::Result;
use crate::pigpio::Pigpio;
use pigpio_driver::{AlertHandler, EventHandler};
use pigpio_protocol::constants::{Edge, Level};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::trace;

/// 标志轮询粒度
const POLL_INTERVAL: Duration = Duration::from_millis(50);

impl Pigpio {
    /// 阻塞等待一次边沿
    ///
    /// 在 `timeout` 内等到匹配的边沿（或该 GPIO 的看门狗超时通知）
    /// 返回 `true`，否则 `false`。`timeout` 为零直接返回 `false`。
    ///
    /// 无论哪条路径，临时订阅都会在返回前注销；守护进程侧的监控
    /// 掩码随之恢复。
    pub fn wait_for_edge(&self, gpio: u32, edge: Edge, timeout: Duration) -> Result<bool> {
        if timeout.is_zero() {
            return Ok(false);
        }

        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();
        let handler: Arc<dyn AlertHandler> =
            Arc::new(move |_gpio: u8, _level: Level, _tick: u32| {
                flag.store(true, Ordering::Release);
            });

        let alert = self
            .connection()
            .registry()
            .add_gpio(gpio, edge, Some(handler))?;

        let triggered = poll_flag(&fired, timeout);
        if !triggered {
            trace!("wait_for_edge gpio {} timed out after {:?}", gpio, timeout);
        }
        self.connection().registry().remove(alert.id())?;
        Ok(triggered)
    }

    /// 阻塞等待一个事件
    ///
    /// 语义与 [`Pigpio::wait_for_edge`] 相同，目标换成事件编号。
    pub fn wait_for_event(&self, event: u32, timeout: Duration) -> Result<bool> {
        if timeout.is_zero() {
            return Ok(false);
        }

        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();
        let handler: Arc<dyn EventHandler> = Arc::new(move |_event: u8, _tick: u32| {
            flag.store(true, Ordering::Release);
        });

        let alert = self.connection().registry().add_event(event, Some(handler))?;

        let triggered = poll_flag(&fired, timeout);
        self.connection().registry().remove(alert.id())?;
        Ok(triggered)
    }
}

/// 以固定粒度轮询标志位，直到置位或超时
fn poll_flag(flag: &AtomicBool, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;

    loop {
        if flag.load(Ordering::Acquire) {
            return true;
        }
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        spin_sleep::sleep(POLL_INTERVAL.min(deadline - now));
    }
}
