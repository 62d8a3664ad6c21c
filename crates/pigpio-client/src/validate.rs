//! 客户端侧参数校验
//!
//! 非法目标在任何守护进程往返之前就地失败，错误码沿用守护进程
//! 的编码，调用方无需区分错误来自哪一侧。

use pigpio_driver::DriverError;
use pigpio_protocol::constants::{MAX_EVENT, MAX_GPIO, MAX_USER_GPIO, MAX_WDOG_TIMEOUT_MS};
use pigpio_protocol::errors::{
    PI_BAD_EVENT_ID, PI_BAD_FILTER, PI_BAD_GPIO, PI_BAD_PULSELEN, PI_BAD_PULSEWIDTH,
    PI_BAD_USER_GPIO, PI_BAD_WDOG_TIMEOUT,
};

/// 毛刺/噪声滤波 steady 参数上限（微秒）
const MAX_FILTER_STEADY_US: u32 = 300_000;
/// 触发脉冲长度上限（微秒）
const MAX_TRIGGER_PULSE_US: u32 = 100;

pub(crate) fn check_gpio(gpio: u32) -> Result<(), DriverError> {
    if gpio > MAX_GPIO {
        return Err(DriverError::daemon(PI_BAD_GPIO));
    }
    Ok(())
}

pub(crate) fn check_user_gpio(gpio: u32) -> Result<(), DriverError> {
    if gpio > MAX_USER_GPIO {
        return Err(DriverError::daemon(PI_BAD_USER_GPIO));
    }
    Ok(())
}

pub(crate) fn check_event(event: u32) -> Result<(), DriverError> {
    if event > MAX_EVENT {
        return Err(DriverError::daemon(PI_BAD_EVENT_ID));
    }
    Ok(())
}

pub(crate) fn check_wdog_timeout(timeout_ms: u32) -> Result<(), DriverError> {
    if timeout_ms > MAX_WDOG_TIMEOUT_MS {
        return Err(DriverError::daemon(PI_BAD_WDOG_TIMEOUT));
    }
    Ok(())
}

pub(crate) fn check_pulsewidth(pulsewidth_us: u32) -> Result<(), DriverError> {
    if pulsewidth_us != 0 && !(500..=2500).contains(&pulsewidth_us) {
        return Err(DriverError::daemon(PI_BAD_PULSEWIDTH));
    }
    Ok(())
}

pub(crate) fn check_filter_steady(steady_us: u32) -> Result<(), DriverError> {
    if steady_us > MAX_FILTER_STEADY_US {
        return Err(DriverError::daemon(PI_BAD_FILTER));
    }
    Ok(())
}

pub(crate) fn check_trigger_pulse(pulse_len_us: u32) -> Result<(), DriverError> {
    if pulse_len_us == 0 || pulse_len_us > MAX_TRIGGER_PULSE_US {
        return Err(DriverError::daemon(PI_BAD_PULSELEN));
    }
    Ok(())
}
