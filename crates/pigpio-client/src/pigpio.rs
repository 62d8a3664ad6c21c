//! Pigpio 客户端
//!
//! 对外的 [`Pigpio`] 结构体，封装连接、同步命令与订阅注册。
//! 命令方法是守护进程 socket 命令的薄包装：客户端侧先做参数
//! 校验（复用守护进程的错误码），再走一次命令往返。

use crate::handles::{AlertHandle, EventHandle};
use crate::validate::*;
use crate::Result;
use pigpio_driver::{
    AlertHandler, Connection, ConnectionConfig, DriverError, EventHandler, LevelSnapshot,
    MetricsSnapshot,
};
use pigpio_protocol::ProtocolError;
use pigpio_protocol::constants::{Edge, Level, Mode, Pud};
use pigpio_protocol::errors::PI_BAD_LEVEL;
use pigpio_protocol::ids::*;
use std::sync::Arc;
use std::time::Duration;

/// pigpio 守护进程客户端
///
/// 一个实例对应一条连接；可以廉价克隆（内部共享连接），多个
/// 克隆可在不同线程同时发起命令——命令通道在驱动层串行化。
///
/// # 示例
///
/// ```no_run
/// use pigpio_client::{Edge, Level, Mode, Pigpio};
///
/// let pi = Pigpio::connect().unwrap();
/// pi.set_mode(17, Mode::Input).unwrap();
/// let level = pi.read(17).unwrap();
/// println!("gpio 17 = {:?}", level);
/// pi.stop().unwrap();
/// ```
#[derive(Clone)]
pub struct Pigpio {
    conn: Arc<Connection>,
}

impl Pigpio {
    /// 按环境变量覆盖后的默认地址连接（`PIGPIO_ADDR` / `PIGPIO_PORT`）
    pub fn connect() -> Result<Self> {
        Self::connect_with_config(ConnectionConfig::from_env())
    }

    /// 连接指定主机
    pub fn connect_to(host: impl Into<String>, port: u16) -> Result<Self> {
        Self::connect_with_config(ConnectionConfig::with_host(host, port))
    }

    /// 用完整配置连接
    pub fn connect_with_config(config: ConnectionConfig) -> Result<Self> {
        Ok(Self::from_connection(Connection::connect(config)?))
    }

    /// 包装一条已建立的连接（测试或自定义传输用）
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(conn),
        }
    }

    /// 底层连接
    pub fn connection(&self) -> &Arc<Connection> {
        &self.conn
    }

    /// 停止连接（幂等；见 [`Connection::stop`]）
    pub fn stop(&self) -> Result<()> {
        self.conn.stop()
    }

    /// 连接是否存活
    pub fn is_alive(&self) -> bool {
        self.conn.is_alive()
    }

    /// 最近一次电平快照（由通知线程维护，无锁读取）
    pub fn levels_snapshot(&self) -> LevelSnapshot {
        self.conn.levels()
    }

    /// 通知链路计数器
    pub fn notify_metrics(&self) -> MetricsSnapshot {
        self.conn.metrics()
    }

    // ------------------------------------------------------------------
    // 基础 GPIO 命令
    // ------------------------------------------------------------------

    /// 设置 GPIO 模式
    pub fn set_mode(&self, gpio: u32, mode: Mode) -> Result<()> {
        check_gpio(gpio)?;
        self.conn.command(CMD_MODES, gpio, mode.into())?;
        Ok(())
    }

    /// 查询 GPIO 模式
    pub fn get_mode(&self, gpio: u32) -> Result<Mode> {
        check_gpio(gpio)?;
        let res = self.conn.command(CMD_MODEG, gpio, 0)? as u32;
        Mode::try_from(res).map_err(|_| {
            DriverError::Protocol(ProtocolError::InvalidValue {
                field: "mode",
                value: res,
            })
        })
    }

    /// 设置上下拉
    pub fn set_pull_up_down(&self, gpio: u32, pud: Pud) -> Result<()> {
        check_gpio(gpio)?;
        self.conn.command(CMD_PUD, gpio, pud.into())?;
        Ok(())
    }

    /// 读取单个 GPIO 电平
    pub fn read(&self, gpio: u32) -> Result<Level> {
        check_gpio(gpio)?;
        let res = self.conn.command(CMD_READ, gpio, 0)?;
        Ok(Level::from_bit(res != 0))
    }

    /// 写入单个 GPIO 电平
    ///
    /// `Level::Timeout` 不是可写电平，客户端侧直接以 `PI_BAD_LEVEL`
    /// 拒绝。
    pub fn write(&self, gpio: u32, level: Level) -> Result<()> {
        check_gpio(gpio)?;
        if !level.is_real() {
            return Err(DriverError::daemon(PI_BAD_LEVEL));
        }
        self.conn.command(CMD_WRITE, gpio, level.into())?;
        Ok(())
    }

    /// 读取 bank 1 全量电平（GPIO 0-31）
    pub fn read_bank_1(&self) -> Result<u32> {
        self.conn.command_raw(CMD_BR1, 0, 0)
    }

    /// 读取 bank 2 全量电平（GPIO 32-53）
    pub fn read_bank_2(&self) -> Result<u32> {
        self.conn.command_raw(CMD_BR2, 0, 0)
    }

    /// 批量清零 bank 1 指定位
    pub fn clear_bank_1(&self, bits: u32) -> Result<()> {
        self.conn.command(CMD_BC1, bits, 0)?;
        Ok(())
    }

    /// 批量置位 bank 1 指定位
    pub fn set_bank_1(&self, bits: u32) -> Result<()> {
        self.conn.command(CMD_BS1, bits, 0)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // PWM / 舵机
    // ------------------------------------------------------------------

    /// 设置 PWM 占空比（范围由守护进程侧配置决定，默认 0-255）
    pub fn set_pwm_dutycycle(&self, user_gpio: u32, dutycycle: u32) -> Result<()> {
        check_user_gpio(user_gpio)?;
        self.conn.command(CMD_PWM, user_gpio, dutycycle)?;
        Ok(())
    }

    /// 查询 PWM 占空比
    pub fn get_pwm_dutycycle(&self, user_gpio: u32) -> Result<u32> {
        check_user_gpio(user_gpio)?;
        Ok(self.conn.command(CMD_GDC, user_gpio, 0)? as u32)
    }

    /// 设置舵机脉宽（0 为停止，否则 500-2500 微秒）
    pub fn set_servo_pulsewidth(&self, user_gpio: u32, pulsewidth_us: u32) -> Result<()> {
        check_user_gpio(user_gpio)?;
        check_pulsewidth(pulsewidth_us)?;
        self.conn.command(CMD_SERVO, user_gpio, pulsewidth_us)?;
        Ok(())
    }

    /// 查询舵机脉宽
    pub fn get_servo_pulsewidth(&self, user_gpio: u32) -> Result<u32> {
        check_user_gpio(user_gpio)?;
        Ok(self.conn.command(CMD_GPW, user_gpio, 0)? as u32)
    }

    // ------------------------------------------------------------------
    // 看门狗 / 滤波 / 触发
    // ------------------------------------------------------------------

    /// 设置看门狗
    ///
    /// 设定后，该 GPIO 在 `timeout_ms` 内没有电平变化时，守护进程
    /// 会发出一条合成的超时通知（订阅回调收到 [`Level::Timeout`]）。
    /// `timeout_ms` 为 0 取消看门狗。
    pub fn set_watchdog(&self, user_gpio: u32, timeout_ms: u32) -> Result<()> {
        check_user_gpio(user_gpio)?;
        check_wdog_timeout(timeout_ms)?;
        self.conn.command(CMD_WDOG, user_gpio, timeout_ms)?;
        Ok(())
    }

    /// 设置毛刺滤波：电平必须稳定 `steady_us` 微秒才上报
    pub fn set_glitch_filter(&self, user_gpio: u32, steady_us: u32) -> Result<()> {
        check_user_gpio(user_gpio)?;
        check_filter_steady(steady_us)?;
        self.conn.command(CMD_FG, user_gpio, steady_us)?;
        Ok(())
    }

    /// 设置噪声滤波
    ///
    /// 电平稳定 `steady_us` 后开始转发 `active_us` 内的变化，然后
    /// 重新等待稳定。
    pub fn set_noise_filter(&self, user_gpio: u32, steady_us: u32, active_us: u32) -> Result<()> {
        check_user_gpio(user_gpio)?;
        check_filter_steady(steady_us)?;
        let active = active_us.to_le_bytes();
        self.conn
            .command_ext(CMD_FN, user_gpio, steady_us, &[active.as_slice()])?;
        Ok(())
    }

    /// 在 GPIO 上发出一个触发脉冲（1-100 微秒），随后恢复原电平
    pub fn gpio_trigger(&self, user_gpio: u32, pulse_len_us: u32, level: Level) -> Result<()> {
        check_user_gpio(user_gpio)?;
        check_trigger_pulse(pulse_len_us)?;
        if !level.is_real() {
            return Err(DriverError::daemon(PI_BAD_LEVEL));
        }
        let level_word = u32::from(level).to_le_bytes();
        self.conn
            .command_ext(CMD_TRIG, user_gpio, pulse_len_us, &[level_word.as_slice()])?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // 杂项查询
    // ------------------------------------------------------------------

    /// 当前守护进程 tick（微秒，约 71.6 分钟回绕）
    pub fn get_current_tick(&self) -> Result<u32> {
        self.conn.command_raw(CMD_TICK, 0, 0)
    }

    /// 硬件版本
    pub fn get_hardware_revision(&self) -> Result<u32> {
        self.conn.command_raw(CMD_HWVER, 0, 0)
    }

    /// pigpio 库版本
    pub fn get_pigpio_version(&self) -> Result<u32> {
        self.conn.command_raw(CMD_PIGPV, 0, 0)
    }

    // ------------------------------------------------------------------
    // 订阅注册
    // ------------------------------------------------------------------

    /// 注册边沿回调
    ///
    /// 回调在通知线程上同步执行，不得长时间阻塞（会停住本连接的
    /// 全部通知派发）。需要微秒级时间戳的场景应使用回调里的 `tick`
    /// 参数，而不是 [`Pigpio::wait_for_edge`]。
    pub fn on_edge(
        &self,
        gpio: u32,
        edge: Edge,
        handler: impl AlertHandler + 'static,
    ) -> Result<AlertHandle> {
        let alert = self
            .conn
            .registry()
            .add_gpio(gpio, edge, Some(Arc::new(handler)))?;
        Ok(AlertHandle::new(self.conn.registry().clone(), alert))
    }

    /// 注册只计数的边沿订阅（默认回调：触发计数器）
    pub fn on_edge_tally(&self, gpio: u32, edge: Edge) -> Result<AlertHandle> {
        let alert = self.conn.registry().add_gpio(gpio, edge, None)?;
        Ok(AlertHandle::new(self.conn.registry().clone(), alert))
    }

    /// 注册事件回调
    pub fn on_event(&self, event: u32, handler: impl EventHandler + 'static) -> Result<EventHandle> {
        let alert = self
            .conn
            .registry()
            .add_event(event, Some(Arc::new(handler)))?;
        Ok(EventHandle::new(self.conn.registry().clone(), alert))
    }

    /// 注册只计数的事件订阅
    pub fn on_event_tally(&self, event: u32) -> Result<EventHandle> {
        let alert = self.conn.registry().add_event(event, None)?;
        Ok(EventHandle::new(self.conn.registry().clone(), alert))
    }

    /// 触发一个事件（所有监控该事件的连接都会收到通知）
    pub fn event_trigger(&self, event: u32) -> Result<()> {
        check_event(event)?;
        self.conn.command(CMD_EVT, event, 0)?;
        Ok(())
    }

    /// 暂停通知转发（订阅保持注册）
    pub fn pause_notifications(&self) -> Result<()> {
        self.conn.pause_notifications()
    }

    /// 恢复通知转发
    pub fn resume_notifications(&self) -> Result<()> {
        self.conn.resume_notifications()
    }

    /// 等待连接活性窗口（调试辅助）：距最近一次报文的时长
    pub fn last_report_age(&self) -> Duration {
        self.conn.last_report_age()
    }
}
