//! 边沿监控示例
//!
//! 订阅一个 GPIO 的双向边沿，持续打印电平变化，Ctrl-C 退出。
//!
//! 运行：
//! ```bash
//! PIGPIO_ADDR=raspberrypi.local cargo run --example edge_monitor -- 17
//! ```

use pigpio_sdk::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

fn main() -> Result<(), DriverError> {
    pigpio_sdk::init_default_logging();

    let gpio: u32 = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(17);

    let pi = Pigpio::connect()?;
    println!(
        "connected, pigpio version {}",
        pi.get_pigpio_version()?
    );

    pi.set_mode(gpio, Mode::Input)?;
    pi.set_pull_up_down(gpio, Pud::Down)?;

    let cb = pi.on_edge(gpio, Edge::Either, |gpio: u8, level: Level, tick: u32| {
        println!("gpio {gpio} -> {level:?} @ {tick} us");
    })?;

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .expect("failed to install Ctrl-C handler");

    println!("monitoring gpio {gpio}, press Ctrl-C to exit");
    while running.load(Ordering::SeqCst) && pi.is_alive() {
        std::thread::sleep(Duration::from_millis(100));
    }

    println!("total transitions: {}", cb.tally());
    cb.cancel()?;
    pi.stop()
}
