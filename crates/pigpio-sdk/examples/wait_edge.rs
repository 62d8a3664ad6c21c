//! 阻塞等待示例
//!
//! 用 `wait_for_edge` 同步等待一次上升沿。注意：等待适配器的
//! 返回时机受 50ms 轮询粒度限制，需要微秒级时间戳请改用回调
//! 形式（见 `edge_monitor` 示例）。

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

    println!("waiting up to 10s for a rising edge on gpio {gpio}...");
    if pi.wait_for_edge(gpio, Edge::Rising, Duration::from_secs(10))? {
        println!("edge detected");
    } else {
        println!("timed out");
    }

    pi.stop()
}
