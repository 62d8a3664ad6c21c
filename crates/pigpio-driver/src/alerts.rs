//! 订阅注册表
//!
//! 管理 GPIO 边沿订阅与事件订阅，维护一条不变量：**注册表的聚合
//! 监控掩码永远等于最近一次成功推送给守护进程的掩码**。任何改变
//! 聚合掩码的增删操作都会在返回前同步推送 NB/EVM。
//!
//! ## 锁纪律
//!
//! 一把锁同时守卫订阅列表和掩码推送 RPC，只在"变更 + 推送"期间
//! 持有；派发时仅在快照匹配订阅的瞬间持锁，用户回调一律在锁外
//! 调用——回调内再注册/取消订阅不会死锁。

use crate::error::DriverError;
use crate::link::CommandLink;
use parking_lot::Mutex;
use pigpio_protocol::constants::{Edge, Level, MAX_EVENT, MAX_USER_GPIO};
use pigpio_protocol::errors::{PI_BAD_EVENT_ID, PI_BAD_USER_GPIO};
use smallvec::SmallVec;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::debug;

/// 订阅回调接口（GPIO 边沿/看门狗）
///
/// 回调在通知线程上同步执行，**不得长时间阻塞**：阻塞会停住整条
/// 连接的全部通知派发，守护进程侧的 socket 缓冲随之积压。
///
/// 闭包 `Fn(u8, Level, u32)` 自动实现本 trait。
pub trait AlertHandler: Send + Sync {
    /// 电平变化或看门狗超时时调用
    ///
    /// # 参数
    /// - `gpio`: GPIO 编号（0-31）
    /// - `level`: 新电平；看门狗超时时为 [`Level::Timeout`]
    /// - `tick`: 守护进程侧微秒时间戳
    fn on_alert(&self, gpio: u8, level: Level, tick: u32);
}

impl<F> AlertHandler for F
where
    F: Fn(u8, Level, u32) + Send + Sync,
{
    fn on_alert(&self, gpio: u8, level: Level, tick: u32) {
        self(gpio, level, tick)
    }
}

/// 事件回调接口
///
/// 事件不携带电平数据，只有事件编号和时间戳。阻塞约束同
/// [`AlertHandler`]。
pub trait EventHandler: Send + Sync {
    fn on_event(&self, event: u8, tick: u32);
}

impl<F> EventHandler for F
where
    F: Fn(u8, u32) + Send + Sync,
{
    fn on_event(&self, event: u8, tick: u32) {
        self(event, tick)
    }
}

/// 订阅句柄标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AlertId(pub(crate) u32);

/// GPIO 边沿订阅
///
/// 每个订阅自带一个触发计数器（tally）：仅在通知线程的派发步骤
/// 中递增，任意线程可读。计数是顾问性质的，最终一致即可。
pub struct GpioAlert {
    id: AlertId,
    gpio: u8,
    edge: Edge,
    handler: Option<Arc<dyn AlertHandler>>,
    tally: AtomicU32,
}

impl std::fmt::Debug for GpioAlert {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpioAlert")
            .field("id", &self.id)
            .field("gpio", &self.gpio)
            .field("edge", &self.edge)
            .field("handler", &self.handler.is_some())
            .field("tally", &self.tally)
            .finish()
    }
}

impl GpioAlert {
    pub fn id(&self) -> AlertId {
        self.id
    }

    pub fn gpio(&self) -> u8 {
        self.gpio
    }

    pub fn edge(&self) -> Edge {
        self.edge
    }

    /// 订阅位掩码（`1 << gpio`）
    pub fn bit(&self) -> u32 {
        1u32 << self.gpio
    }

    /// 累计触发次数
    pub fn tally(&self) -> u32 {
        self.tally.load(Ordering::Relaxed)
    }

    fn fire(&self, level: Level, tick: u32) {
        self.tally.fetch_add(1, Ordering::Relaxed);
        if let Some(handler) = &self.handler {
            handler.on_alert(self.gpio, level, tick);
        }
    }
}

/// 事件订阅
pub struct EventAlert {
    id: AlertId,
    event: u8,
    handler: Option<Arc<dyn EventHandler>>,
    tally: AtomicU32,
}

impl std::fmt::Debug for EventAlert {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventAlert")
            .field("id", &self.id)
            .field("event", &self.event)
            .field("handler", &self.handler.is_some())
            .field("tally", &self.tally)
            .finish()
    }
}

impl EventAlert {
    pub fn id(&self) -> AlertId {
        self.id
    }

    pub fn event(&self) -> u8 {
        self.event
    }

    pub fn tally(&self) -> u32 {
        self.tally.load(Ordering::Relaxed)
    }

    fn fire(&self, tick: u32) {
        self.tally.fetch_add(1, Ordering::Relaxed);
        if let Some(handler) = &self.handler {
            handler.on_event(self.event, tick);
        }
    }
}

#[derive(Default)]
struct RegistryInner {
    gpio_alerts: Vec<Arc<GpioAlert>>,
    event_alerts: Vec<Arc<EventAlert>>,
    /// 最近一次成功推送的 GPIO 掩码
    gpio_mask: u32,
    /// 最近一次成功推送的事件掩码
    event_mask: u32,
}

impl RegistryInner {
    fn gpio_mask_of_alerts(&self) -> u32 {
        self.gpio_alerts.iter().fold(0, |m, a| m | a.bit())
    }

    fn event_mask_of_alerts(&self) -> u32 {
        self.event_alerts.iter().fold(0, |m, a| m | (1u32 << a.event))
    }
}

/// 订阅注册表
pub struct AlertRegistry {
    link: Arc<CommandLink>,
    inner: Mutex<RegistryInner>,
    next_id: AtomicU32,
}

impl AlertRegistry {
    pub(crate) fn new(link: Arc<CommandLink>) -> Self {
        Self {
            link,
            inner: Mutex::new(RegistryInner::default()),
            next_id: AtomicU32::new(0),
        }
    }

    fn alloc_id(&self) -> AlertId {
        AlertId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// 注册 GPIO 边沿订阅
    ///
    /// `handler` 为 `None` 时只做触发计数（tally）。GPIO 超出 0-31
    /// 立即以 `PI_BAD_USER_GPIO` 失败，不发生任何守护进程往返。
    /// 聚合掩码变化时同步推送 NB；推送失败则回滚本次注册。
    pub fn add_gpio(
        &self,
        gpio: u32,
        edge: Edge,
        handler: Option<Arc<dyn AlertHandler>>,
    ) -> Result<Arc<GpioAlert>, DriverError> {
        if gpio > MAX_USER_GPIO {
            return Err(DriverError::daemon(PI_BAD_USER_GPIO));
        }

        let alert = Arc::new(GpioAlert {
            id: self.alloc_id(),
            gpio: gpio as u8,
            edge,
            handler,
            tally: AtomicU32::new(0),
        });

        let mut inner = self.inner.lock();
        inner.gpio_alerts.push(alert.clone());

        let mask = inner.gpio_mask_of_alerts();
        if mask != inner.gpio_mask {
            if let Err(e) = self.link.push_gpio_mask(mask) {
                inner.gpio_alerts.pop();
                return Err(e);
            }
            debug!("gpio monitor mask updated: {:#010x}", mask);
            inner.gpio_mask = mask;
        }

        Ok(alert)
    }

    /// 注册事件订阅
    ///
    /// 校验与掩码推送语义同 [`AlertRegistry::add_gpio`]，掩码命令为
    /// EVM。
    pub fn add_event(
        &self,
        event: u32,
        handler: Option<Arc<dyn EventHandler>>,
    ) -> Result<Arc<EventAlert>, DriverError> {
        if event > MAX_EVENT {
            return Err(DriverError::daemon(PI_BAD_EVENT_ID));
        }

        let alert = Arc::new(EventAlert {
            id: self.alloc_id(),
            event: event as u8,
            handler,
            tally: AtomicU32::new(0),
        });

        let mut inner = self.inner.lock();
        inner.event_alerts.push(alert.clone());

        let mask = inner.event_mask_of_alerts();
        if mask != inner.event_mask {
            if let Err(e) = self.link.push_event_mask(mask) {
                inner.event_alerts.pop();
                return Err(e);
            }
            debug!("event monitor mask updated: {:#010x}", mask);
            inner.event_mask = mask;
        }

        Ok(alert)
    }

    /// 取消订阅
    ///
    /// 只保证停止**之后的**派发：正在进行的回调会完整执行。移除后
    /// 若聚合掩码缩小则重新推送；推送失败时订阅保持移除（守护进程
    /// 会多转发一些无人消费的报文，直到下一次推送成功为止），错误
    /// 原样返回。
    pub fn remove(&self, id: AlertId) -> Result<(), DriverError> {
        let mut inner = self.inner.lock();

        if let Some(pos) = inner.gpio_alerts.iter().position(|a| a.id == id) {
            inner.gpio_alerts.remove(pos);
            let mask = inner.gpio_mask_of_alerts();
            if mask != inner.gpio_mask {
                self.link.push_gpio_mask(mask)?;
                debug!("gpio monitor mask updated: {:#010x}", mask);
                inner.gpio_mask = mask;
            }
            return Ok(());
        }

        if let Some(pos) = inner.event_alerts.iter().position(|a| a.id == id) {
            inner.event_alerts.remove(pos);
            let mask = inner.event_mask_of_alerts();
            if mask != inner.event_mask {
                self.link.push_event_mask(mask)?;
                debug!("event monitor mask updated: {:#010x}", mask);
                inner.event_mask = mask;
            }
            return Ok(());
        }

        Err(DriverError::AlertNotFound(id))
    }

    /// 当前已推送的 GPIO 监控掩码
    pub fn gpio_monitor_mask(&self) -> u32 {
        self.inner.lock().gpio_mask
    }

    /// 当前已推送的事件监控掩码
    pub fn event_monitor_mask(&self) -> u32 {
        self.inner.lock().event_mask
    }

    /// 重新推送两个掩码（暂停后恢复用）
    pub(crate) fn resync(&self) -> Result<(), DriverError> {
        let inner = self.inner.lock();
        self.link.push_gpio_mask(inner.gpio_mask)?;
        if inner.event_mask != 0 {
            self.link.push_event_mask(inner.event_mask)?;
        }
        Ok(())
    }

    /// 派发一次电平变化
    ///
    /// `changed` 是新旧快照的 XOR 差分。边沿过滤按显式匹配实现：
    /// Either 无条件触发，Rising 仅在新电平为高、Falling 仅在新
    /// 电平为低时触发。
    pub(crate) fn dispatch_level_change(&self, changed: u32, level: u32, tick: u32) {
        let hits: SmallVec<[Arc<GpioAlert>; 4]> = {
            let inner = self.inner.lock();
            inner
                .gpio_alerts
                .iter()
                .filter(|a| a.bit() & changed != 0)
                .cloned()
                .collect()
        };

        for alert in hits {
            let high = level & alert.bit() != 0;
            let fires = match alert.edge {
                Edge::Either => true,
                Edge::Rising => high,
                Edge::Falling => !high,
            };
            if fires {
                alert.fire(Level::from_bit(high), tick);
            }
        }
    }

    /// 派发一次看门狗超时
    ///
    /// 该 GPIO 上的**所有**订阅都会收到 [`Level::Timeout`]，不做
    /// 边沿过滤；电平快照不受影响。
    pub(crate) fn dispatch_watchdog(&self, gpio: u8, tick: u32) {
        let hits: SmallVec<[Arc<GpioAlert>; 4]> = {
            let inner = self.inner.lock();
            inner
                .gpio_alerts
                .iter()
                .filter(|a| a.gpio == gpio)
                .cloned()
                .collect()
        };

        for alert in hits {
            alert.fire(Level::Timeout, tick);
        }
    }

    /// 派发一次事件
    pub(crate) fn dispatch_event(&self, event: u8, tick: u32) {
        let hits: SmallVec<[Arc<EventAlert>; 4]> = {
            let inner = self.inner.lock();
            inner
                .event_alerts
                .iter()
                .filter(|a| a.event == event)
                .cloned()
                .collect()
        };

        for alert in hits {
            alert.fire(tick);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::CommandLink;
    use pigpio_protocol::ids::{CMD_EVM, CMD_NB};
    use pigpio_transport::{CommandChannel, MockControl, MockTransport};

    const HANDLE: u32 = 3;

    fn registry() -> (AlertRegistry, MockControl) {
        let (transport, control) = MockTransport::with_auto_ack();
        let chan = CommandChannel::new(Box::new(transport));
        let link = Arc::new(CommandLink::new(chan, HANDLE));
        (AlertRegistry::new(link), control)
    }

    #[test]
    fn test_add_gpio_pushes_mask() {
        let (registry, control) = registry();
        registry.add_gpio(17, Edge::Either, None).unwrap();

        assert_eq!(registry.gpio_monitor_mask(), 1 << 17);
        assert_eq!(control.sent_params(CMD_NB), vec![(HANDLE, 1 << 17)]);
    }

    #[test]
    fn test_add_same_gpio_twice_pushes_once() {
        let (registry, control) = registry();
        registry.add_gpio(4, Edge::Rising, None).unwrap();
        registry.add_gpio(4, Edge::Falling, None).unwrap();

        // 聚合掩码没变，第二次注册不应有守护进程往返
        assert_eq!(control.sent_params(CMD_NB), vec![(HANDLE, 1 << 4)]);
    }

    #[test]
    fn test_add_then_remove_restores_mask() {
        let (registry, control) = registry();
        let keep = registry.add_gpio(4, Edge::Rising, None).unwrap();
        let transient = registry.add_gpio(17, Edge::Either, None).unwrap();
        registry.remove(transient.id()).unwrap();

        assert_eq!(registry.gpio_monitor_mask(), 1 << 4);
        assert_eq!(
            control.sent_params(CMD_NB),
            vec![
                (HANDLE, 1 << 4),
                (HANDLE, (1 << 4) | (1 << 17)),
                (HANDLE, 1 << 4),
            ]
        );
        drop(keep);
    }

    #[test]
    fn test_remove_last_subscription_clears_bit() {
        let (registry, control) = registry();
        let alert = registry.add_gpio(23, Edge::Either, None).unwrap();
        registry.remove(alert.id()).unwrap();

        assert_eq!(registry.gpio_monitor_mask(), 0);
        assert_eq!(
            control.sent_params(CMD_NB),
            vec![(HANDLE, 1 << 23), (HANDLE, 0)]
        );
    }

    #[test]
    fn test_add_gpio_out_of_range_fails_without_io() {
        let (registry, control) = registry();
        let err = registry.add_gpio(32, Edge::Either, None).unwrap_err();

        assert_eq!(err.daemon_code(), Some(PI_BAD_USER_GPIO));
        assert!(control.sent_commands().is_empty());
    }

    #[test]
    fn test_add_event_pushes_event_mask() {
        let (registry, control) = registry();
        registry.add_event(5, None).unwrap();

        assert_eq!(registry.event_monitor_mask(), 1 << 5);
        assert_eq!(control.sent_params(CMD_EVM), vec![(HANDLE, 1 << 5)]);
    }

    #[test]
    fn test_add_event_out_of_range() {
        let (registry, _control) = registry();
        let err = registry.add_event(40, None).unwrap_err();
        assert_eq!(err.daemon_code(), Some(PI_BAD_EVENT_ID));
    }

    #[test]
    fn test_remove_unknown_id() {
        let (registry, _control) = registry();
        let err = registry.remove(AlertId(999)).unwrap_err();
        assert!(matches!(err, DriverError::AlertNotFound(_)));
    }

    #[test]
    fn test_dispatch_edge_filter_truth_table() {
        let (registry, _control) = registry();
        let rising = registry.add_gpio(7, Edge::Rising, None).unwrap();
        let falling = registry.add_gpio(7, Edge::Falling, None).unwrap();
        let either = registry.add_gpio(7, Edge::Either, None).unwrap();

        // 上升沿：bit 7 变化，新电平为高
        registry.dispatch_level_change(1 << 7, 1 << 7, 1000);
        assert_eq!(rising.tally(), 1);
        assert_eq!(falling.tally(), 0);
        assert_eq!(either.tally(), 1);

        // 下降沿：bit 7 变化，新电平为低
        registry.dispatch_level_change(1 << 7, 0, 2000);
        assert_eq!(rising.tally(), 1);
        assert_eq!(falling.tally(), 1);
        assert_eq!(either.tally(), 2);
    }

    #[test]
    fn test_dispatch_rule_exhaustive_truth_table() {
        // 穷举（过滤器 × 新电平）的全部组合：
        // Either 恒触发，Rising ⇔ 高，Falling ⇔ 低
        let cases = [
            (Edge::Rising, true, true),
            (Edge::Rising, false, false),
            (Edge::Falling, true, false),
            (Edge::Falling, false, true),
            (Edge::Either, true, true),
            (Edge::Either, false, true),
        ];

        for (edge, new_high, expect_fire) in cases {
            let (registry, _control) = registry();
            let alert = registry.add_gpio(20, edge, None).unwrap();
            let level = if new_high { 1 << 20 } else { 0 };
            registry.dispatch_level_change(1 << 20, level, 0);
            assert_eq!(
                alert.tally(),
                u32::from(expect_fire),
                "edge={edge:?} new_high={new_high}"
            );
        }
    }

    #[test]
    fn test_dispatch_ignores_unchanged_bits() {
        let (registry, _control) = registry();
        let alert = registry.add_gpio(3, Edge::Either, None).unwrap();

        // bit 9 变化，bit 3 没变
        registry.dispatch_level_change(1 << 9, (1 << 9) | (1 << 3), 500);
        assert_eq!(alert.tally(), 0);
    }

    #[test]
    fn test_two_filters_share_one_report() {
        let (registry, _control) = registry();
        let rising = registry.add_gpio(11, Edge::Rising, None).unwrap();
        let either = registry.add_gpio(11, Edge::Either, None).unwrap();

        registry.dispatch_level_change(1 << 11, 1 << 11, 42);
        assert_eq!(rising.tally(), 1);
        assert_eq!(either.tally(), 1);
    }

    #[test]
    fn test_watchdog_fires_all_filters_with_timeout_level() {
        let (registry, _control) = registry();
        let captured = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = captured.clone();
        let handler: Arc<dyn AlertHandler> = Arc::new(move |gpio: u8, level: Level, tick: u32| {
            sink.lock().push((gpio, level, tick));
        });

        let rising = registry.add_gpio(9, Edge::Rising, Some(handler)).unwrap();
        registry.dispatch_watchdog(9, 777);
        registry.dispatch_watchdog(8, 888); // 无人订阅

        assert_eq!(rising.tally(), 1);
        assert_eq!(&*captured.lock(), &[(9, Level::Timeout, 777)]);
    }

    #[test]
    fn test_event_dispatch_by_id() {
        let (registry, _control) = registry();
        let hits = Arc::new(AtomicU32::new(0));
        let sink = hits.clone();
        let handler: Arc<dyn EventHandler> = Arc::new(move |event: u8, _tick: u32| {
            assert_eq!(event, 12);
            sink.fetch_add(1, Ordering::Relaxed);
        });

        registry.add_event(12, Some(handler)).unwrap();
        registry.dispatch_event(12, 1);
        registry.dispatch_event(13, 2);
        assert_eq!(hits.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_callback_may_cancel_itself_without_deadlock() {
        let (registry, _control) = registry();
        let registry = Arc::new(registry);

        let id_cell = Arc::new(parking_lot::Mutex::new(None::<AlertId>));
        let reg = registry.clone();
        let cell = id_cell.clone();
        let handler: Arc<dyn AlertHandler> = Arc::new(move |_g: u8, _l: Level, _t: u32| {
            if let Some(id) = cell.lock().take() {
                reg.remove(id).unwrap();
            }
        });

        let alert = registry.add_gpio(2, Edge::Either, Some(handler)).unwrap();
        *id_cell.lock() = Some(alert.id());

        registry.dispatch_level_change(1 << 2, 1 << 2, 0);
        assert_eq!(registry.gpio_monitor_mask(), 0);
    }
}
