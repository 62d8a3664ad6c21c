//! Socket 命令 ID 常量定义
//!
//! 数值来自 pigpiod 的 socket 接口（`pigpio.h` 的 `PI_CMD_*` 表）。
//! 本 SDK 只声明它实际会发出的命令；守护进程的完整命令表远大于此。

/// 设置 GPIO 模式（p1=gpio, p2=mode）
pub const CMD_MODES: u32 = 0;
/// 查询 GPIO 模式（p1=gpio）
pub const CMD_MODEG: u32 = 1;
/// 设置上下拉（p1=gpio, p2=pud）
pub const CMD_PUD: u32 = 2;
/// 读取单个 GPIO 电平（p1=gpio）
pub const CMD_READ: u32 = 3;
/// 写入单个 GPIO 电平（p1=gpio, p2=level）
pub const CMD_WRITE: u32 = 4;
/// 设置 PWM 占空比（p1=gpio, p2=dutycycle）
pub const CMD_PWM: u32 = 5;
/// 设置舵机脉宽（p1=gpio, p2=pulsewidth）
pub const CMD_SERVO: u32 = 8;
/// 设置看门狗（p1=gpio, p2=timeout_ms）
pub const CMD_WDOG: u32 = 9;
/// 读取 bank 1 电平快照
pub const CMD_BR1: u32 = 10;
/// 读取 bank 2 电平快照
pub const CMD_BR2: u32 = 11;
/// 清除 bank 1 指定位（p1=bits）
pub const CMD_BC1: u32 = 12;
/// 置位 bank 1 指定位（p1=bits）
pub const CMD_BS1: u32 = 14;
/// 读取当前 tick（微秒计数器）
pub const CMD_TICK: u32 = 16;
/// 读取硬件版本
pub const CMD_HWVER: u32 = 17;
/// 打开通知管道（经 fifo，SDK 不使用；保留编号以示完整）
pub const CMD_NO: u32 = 18;
/// 更新通知掩码（p1=handle, p2=mask）
pub const CMD_NB: u32 = 19;
/// 暂停通知（p1=handle）
pub const CMD_NP: u32 = 20;
/// 关闭通知句柄（p1=handle）
pub const CMD_NC: u32 = 21;
/// 读取 pigpio 版本
pub const CMD_PIGPV: u32 = 26;
/// GPIO 触发脉冲（p1=gpio, p2=pulse_len_us, ext=[level: u32]）
pub const CMD_TRIG: u32 = 37;
/// 查询 PWM 占空比（p1=gpio）
pub const CMD_GDC: u32 = 83;
/// 查询舵机脉宽（p1=gpio）
pub const CMD_GPW: u32 = 84;
/// 设置毛刺滤波（p1=gpio, p2=steady_us）
pub const CMD_FG: u32 = 97;
/// 设置噪声滤波（p1=gpio, p2=steady_us, ext=[active_us: u32]）
pub const CMD_FN: u32 = 98;
/// 在当前 socket 上打开带内通知流（返回 handle）
pub const CMD_NOIB: u32 = 99;
/// 更新事件监控掩码（p1=handle, p2=mask）
pub const CMD_EVM: u32 = 115;
/// 触发事件（p1=event）
pub const CMD_EVT: u32 = 116;
