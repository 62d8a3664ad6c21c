//! 看门狗示例
//!
//! 给 GPIO 设一个 2 秒的看门狗：没有电平变化时，守护进程每 2 秒
//! 发出一条合成的超时通知，回调收到 `Level::Timeout` 哨兵值。
//! 真实电平变化照常上报，且会重置看门狗计时。

use pigpio_sdk::prelude::*;
use std::time::Duration;

fn main() -> Result<(), DriverError> {
    pigpio_sdk::init_default_logging();

    let gpio: u32 = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(17);

    let pi = Pigpio::connect()?;
    pi.set_mode(gpio, Mode::Input)?;

    let cb = pi.on_edge(gpio, Edge::Either, |gpio: u8, level: Level, tick: u32| {
        match level {
            Level::Timeout => println!("gpio {gpio}: watchdog timeout @ {tick} us"),
            real => println!("gpio {gpio} -> {real:?} @ {tick} us"),
        }
    })?;

    pi.set_watchdog(gpio, 2000)?;
    println!("watchdog armed on gpio {gpio}, watching for 10s");
    std::thread::sleep(Duration::from_secs(10));

    // 取消看门狗并退订
    pi.set_watchdog(gpio, 0)?;
    cb.cancel()?;
    pi.stop()
}
