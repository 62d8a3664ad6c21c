//! 守护进程错误码表
//!
//! 命令结果字为负时即为这里的错误码。编号与文案取自 pigpio 的
//! 固定错误表；SDK 在客户端校验失败时也返回同一套编码，
//! 以便调用方统一处理。

/// gpioInitialise 失败
pub const PI_INIT_FAILED: i32 = -1;
/// gpio 不在 0-31
pub const PI_BAD_USER_GPIO: i32 = -2;
/// gpio 不在 0-53
pub const PI_BAD_GPIO: i32 = -3;
/// mode 不在 0-7
pub const PI_BAD_MODE: i32 = -4;
/// level 不在 0-1
pub const PI_BAD_LEVEL: i32 = -5;
/// pud 不在 0-2
pub const PI_BAD_PUD: i32 = -6;
/// pulsewidth 不是 0 或 500-2500
pub const PI_BAD_PULSEWIDTH: i32 = -7;
/// dutycycle 超出设定范围
pub const PI_BAD_DUTYCYCLE: i32 = -8;
/// 看门狗超时不在 0-60000
pub const PI_BAD_WDOG_TIMEOUT: i32 = -15;
/// 没有可用句柄
pub const PI_NO_HANDLE: i32 = -24;
/// 未知通知句柄
pub const PI_BAD_HANDLE: i32 = -25;
/// 无权限更新 gpio
pub const PI_NOT_PERMITTED: i32 = -41;
/// 部分 gpio 无权限更新
pub const PI_SOME_PERMITTED: i32 = -42;
/// 触发脉冲超过 100 微秒
pub const PI_BAD_PULSELEN: i32 = -46;
/// 滤波参数非法
pub const PI_BAD_FILTER: i32 = -125;
/// 事件 ID 不在 0-31
pub const PI_BAD_EVENT_ID: i32 = -143;

/// 错误码转文案
///
/// 未收录的编码返回通用文案；表内容与守护进程的 `errInfo[]` 一致。
pub fn error_text(code: i32) -> &'static str {
    match code {
        PI_INIT_FAILED => "pigpio initialisation failed",
        PI_BAD_USER_GPIO => "gpio not 0-31",
        PI_BAD_GPIO => "gpio not 0-53",
        PI_BAD_MODE => "mode not 0-7",
        PI_BAD_LEVEL => "level not 0-1",
        PI_BAD_PUD => "pud not 0-2",
        PI_BAD_PULSEWIDTH => "pulsewidth not 0 or 500-2500",
        PI_BAD_DUTYCYCLE => "dutycycle outside set range",
        -9 => "timer not 0-9",
        -10 => "ms not 10-60000",
        PI_BAD_WDOG_TIMEOUT => "timeout not 0-60000",
        -19 => "clock micros not 1, 2, 4, 5, 8, or 10",
        -20 => "buf millis not 100-10000",
        -21 => "dutycycle range not 25-40000",
        -23 => "can't open pathname",
        PI_NO_HANDLE => "no handle available",
        PI_BAD_HANDLE => "unknown handle",
        -28 => "socket port not 1024-32000",
        -31 => "function called before gpioInitialise",
        -32 => "function called after gpioInitialise",
        PI_NOT_PERMITTED => "GPIO operation not permitted",
        PI_SOME_PERMITTED => "one or more GPIO not permitted",
        PI_BAD_PULSELEN => "trigger pulse > 100 microseconds",
        -50 => "GPIO already in use",
        PI_BAD_FILTER => "bad filter parameter",
        PI_BAD_EVENT_ID => "bad event id",
        _ => "unknown error",
    }
}
