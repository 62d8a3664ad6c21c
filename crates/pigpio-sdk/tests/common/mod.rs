//! 集成测试公共设施

pub mod fake_daemon;

use std::time::{Duration, Instant};

/// 轮询等待条件成立（集成测试用，上限 2 秒）
pub fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    cond()
}
