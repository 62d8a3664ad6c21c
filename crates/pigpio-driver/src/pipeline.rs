//! 通知流水线
//!
//! 后台线程的读取/解码/派发循环。通知 socket 上是 12 字节报文的
//! 连续字节流，没有任何分隔符——socket 一次读到的字节数和报文
//! 边界没有关系，必须先进缓冲区，凑满 12 字节才切出一条报文。
//!
//! `last_level` 由本线程独占：每条电平变化报文与上一快照做 XOR
//! 得到变化位，再交给注册表派发。看门狗/keep-alive/事件报文不
//! 触碰 `last_level`。

use crate::alerts::AlertRegistry;
use crate::context::{ConnContext, LevelSnapshot};
use bytes::BytesMut;
use pigpio_protocol::{REPORT_SIZE, Report, ReportKind};
use pigpio_transport::{Transport, TransportError};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{error, info, trace, warn};

/// 单次 socket 读取的暂存区大小（约 170 条报文）
const SCRATCH_SIZE: usize = 2048;

/// 通知线程主循环
///
/// 循环直到停止标志置位或链路失效。链路失效（对端关闭、读出错）
/// 时将停止标志一并置位，让连接上的后续 API 调用明确失败而不是
/// 悬挂；不做自动重连。
///
/// # 参数
/// - `transport`: 通知 socket（NOIB 握手后整体移交给本线程）
/// - `registry`: 订阅注册表（派发目标）
/// - `ctx`: 共享状态上下文（快照发布、活性时钟、计数器）
/// - `stop`: 停止标志（Acquire 读，见 [`crate::Connection::stop`]）
/// - `initial_level`: 连接建立时经 BR1 拉取的初始快照。必须在本
///   线程启动**之前**取得，否则首条差分会把当前为高的每个 GPIO
///   都误报成"刚刚上升"。
/// - `keepalive_window`: 活性窗口，超过即告警一次
pub(crate) fn notify_loop(
    mut transport: Box<dyn Transport>,
    registry: Arc<AlertRegistry>,
    ctx: Arc<ConnContext>,
    stop: Arc<AtomicBool>,
    initial_level: u32,
    keepalive_window: Duration,
) {
    let mut buf = BytesMut::with_capacity(4 * SCRATCH_SIZE);
    let mut scratch = [0u8; SCRATCH_SIZE];
    let mut last_level = initial_level;
    let mut expected_seq: Option<u16> = None;
    let mut stale_warned = false;

    loop {
        // Acquire: 看到 true 时必须看到 stop() 之前的全部写入
        if stop.load(Ordering::Acquire) {
            trace!("notify thread: stop flag set, exiting");
            break;
        }

        let n = match transport.recv(&mut scratch) {
            Ok(n) => n,
            Err(TransportError::Timeout) => {
                // 超时是常态，顺带检查链路活性
                if !stale_warned && ctx.last_report_age() > keepalive_window {
                    warn!(
                        "no report from pigpiod for over {:?}, link may be dead",
                        keepalive_window
                    );
                    stale_warned = true;
                }
                continue;
            },
            Err(TransportError::Closed) => {
                info!("notification stream closed by daemon");
                break;
            },
            Err(e) => {
                error!("notification stream read error: {}", e);
                break;
            },
        };

        buf.extend_from_slice(&scratch[..n]);

        // 只消费完整报文，不足 12 字节的尾巴留在缓冲区等下一次读取
        while buf.len() >= REPORT_SIZE {
            let raw = buf.split_to(REPORT_SIZE);
            let Ok(report) = Report::decode(&raw) else {
                // 12 字节定长解码不会失败
                continue;
            };

            stale_warned = false;
            ctx.register_report();
            ctx.metrics.reports_total.fetch_add(1, Ordering::Relaxed);

            if let Some(expected) = expected_seq
                && report.seqno != expected
            {
                ctx.metrics.seq_gaps.fetch_add(1, Ordering::Relaxed);
                trace!(
                    "report sequence gap: expected {}, got {}",
                    expected, report.seqno
                );
            }
            expected_seq = Some(report.seqno.wrapping_add(1));

            match report.kind() {
                ReportKind::LevelChange => {
                    let changed = report.level ^ last_level;
                    last_level = report.level;
                    ctx.publish_levels(LevelSnapshot {
                        tick: report.tick,
                        levels: report.level,
                    });
                    ctx.metrics.level_changes.fetch_add(1, Ordering::Relaxed);

                    if changed != 0 {
                        registry.dispatch_level_change(changed, report.level, report.tick);
                    }
                },
                ReportKind::Watchdog { gpio } => {
                    ctx.metrics.watchdogs.fetch_add(1, Ordering::Relaxed);
                    registry.dispatch_watchdog(gpio, report.tick);
                },
                ReportKind::KeepAlive => {
                    ctx.metrics.keep_alives.fetch_add(1, Ordering::Relaxed);
                },
                ReportKind::Event { event } => {
                    ctx.metrics.events.fetch_add(1, Ordering::Relaxed);
                    registry.dispatch_event(event, report.tick);
                },
                ReportKind::Unknown(flags) => {
                    ctx.metrics.unknown_reports.fetch_add(1, Ordering::Relaxed);
                    trace!("ignoring report with unknown flags {:#06x}", flags);
                },
            }
        }
    }

    // 链路失效与显式 stop 走同一条出口：置位停止标志，
    // 让命令 API 对死连接立刻报错
    stop.store(true, Ordering::Release);
    trace!("notify thread: loop exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::CommandLink;
    use pigpio_protocol::constants::{Edge, Level, NTFY_FLAGS_ALIVE, NTFY_FLAGS_WDOG};
    use pigpio_transport::{CommandChannel, MockControl, MockTransport};
    use std::thread;

    fn test_registry() -> (Arc<AlertRegistry>, MockControl) {
        let (transport, control) = MockTransport::with_auto_ack();
        let link = Arc::new(CommandLink::new(
            CommandChannel::new(Box::new(transport)),
            1,
        ));
        (Arc::new(AlertRegistry::new(link)), control)
    }

    fn report(seqno: u16, flags: u16, tick: u32, level: u32) -> Report {
        Report {
            seqno,
            flags,
            tick,
            level,
        }
    }

    /// 同步驱动流水线：mock 队列里的数据消费完后标记关闭，
    /// notify_loop 退出，线程 join
    fn drive(
        transport: MockTransport,
        control: &MockControl,
        registry: Arc<AlertRegistry>,
        ctx: Arc<ConnContext>,
        initial_level: u32,
    ) {
        control.set_closed();
        let stop = Arc::new(AtomicBool::new(false));
        let handle = thread::spawn(move || {
            notify_loop(
                Box::new(transport),
                registry,
                ctx,
                stop,
                initial_level,
                Duration::from_secs(60),
            );
        });
        handle.join().unwrap();
    }

    #[test]
    fn test_either_edge_tally_counts_both_transitions() {
        // 订阅 GPIO 17 EITHER_EDGE，喂 0 -> bit17 -> 0 两条报文
        let (registry, _reg_control) = test_registry();
        let alert = registry.add_gpio(17, Edge::Either, None).unwrap();

        let (transport, control) = MockTransport::new();
        control.queue_report(report(0, 0, 100, 1 << 17));
        control.queue_report(report(1, 0, 200, 0));

        let ctx = Arc::new(ConnContext::new(LevelSnapshot::default()));
        drive(transport, &control, registry.clone(), ctx.clone(), 0);

        assert_eq!(alert.tally(), 2);
        assert_eq!(ctx.metrics().level_changes, 2);
        assert_eq!(ctx.levels(), LevelSnapshot { tick: 200, levels: 0 });
    }

    #[test]
    fn test_rising_edge_fires_once_for_fall_then_rise() {
        // 订阅 GPIO 4 RISING_EDGE，先下降后上升，只触发一次
        let (registry, _reg_control) = test_registry();
        let alert = registry.add_gpio(4, Edge::Rising, None).unwrap();

        let (transport, control) = MockTransport::new();
        control.queue_report(report(0, 0, 100, 0)); // bit4: 1 -> 0
        control.queue_report(report(1, 0, 200, 1 << 4)); // bit4: 0 -> 1

        let ctx = Arc::new(ConnContext::new(LevelSnapshot {
            tick: 0,
            levels: 1 << 4,
        }));
        drive(transport, &control, registry.clone(), ctx, 1 << 4);

        assert_eq!(alert.tally(), 1);
    }

    #[test]
    fn test_partial_reports_reassembled_across_reads() {
        let (registry, _reg_control) = test_registry();
        let alert = registry.add_gpio(5, Edge::Either, None).unwrap();

        let first = report(0, 0, 100, 1 << 5).encode();
        let second = report(1, 0, 200, 0).encode();

        let (transport, control) = MockTransport::new();
        // 7 + 5 字节拼出第一条；第二条和下一条的前半粘在一起
        control.queue_bytes(&first[..7]);
        control.queue_bytes(&first[7..]);
        let mut glued = second.to_vec();
        let third = report(2, 0, 300, 1 << 5).encode();
        glued.extend_from_slice(&third[..4]);
        control.queue_bytes(&glued);
        control.queue_bytes(&third[4..]);

        let ctx = Arc::new(ConnContext::new(LevelSnapshot::default()));
        drive(transport, &control, registry.clone(), ctx.clone(), 0);

        assert_eq!(alert.tally(), 3);
        assert_eq!(ctx.metrics().reports_total, 3);
        assert_eq!(ctx.metrics().seq_gaps, 0);
    }

    #[test]
    fn test_unchanged_snapshot_dispatches_nothing() {
        let (registry, _reg_control) = test_registry();
        let alert = registry.add_gpio(6, Edge::Either, None).unwrap();

        let (transport, control) = MockTransport::new();
        control.queue_report(report(0, 0, 100, 1 << 6));
        control.queue_report(report(1, 0, 200, 1 << 6)); // 快照未变

        let ctx = Arc::new(ConnContext::new(LevelSnapshot::default()));
        drive(transport, &control, registry.clone(), ctx.clone(), 0);

        assert_eq!(alert.tally(), 1);
        assert_eq!(ctx.metrics().level_changes, 2);
    }

    #[test]
    fn test_watchdog_does_not_touch_last_level() {
        let (registry, _reg_control) = test_registry();
        let captured = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = captured.clone();
        let handler: Arc<dyn crate::AlertHandler> =
            Arc::new(move |gpio: u8, level: Level, tick: u32| {
                sink.lock().push((gpio, level, tick));
            });
        let alert = registry.add_gpio(12, Edge::Either, Some(handler)).unwrap();

        let (transport, control) = MockTransport::new();
        control.queue_report(report(0, 0, 100, 1 << 12)); // 上升
        control.queue_report(report(1, NTFY_FLAGS_WDOG | 12, 200, 0xFFFF_FFFF)); // 看门狗，level 字段无意义
        control.queue_report(report(2, 0, 300, 0)); // 相对 bit12=1 的下降

        let ctx = Arc::new(ConnContext::new(LevelSnapshot::default()));
        drive(transport, &control, registry.clone(), ctx.clone(), 0);

        assert_eq!(alert.tally(), 3);
        assert_eq!(
            &*captured.lock(),
            &[
                (12, Level::High, 100),
                (12, Level::Timeout, 200),
                (12, Level::Low, 300),
            ]
        );
        assert_eq!(ctx.metrics().watchdogs, 1);
    }

    #[test]
    fn test_keepalive_refreshes_liveness_without_dispatch() {
        let (registry, _reg_control) = test_registry();
        let alert = registry.add_gpio(1, Edge::Either, None).unwrap();

        let (transport, control) = MockTransport::new();
        control.queue_report(report(0, NTFY_FLAGS_ALIVE, 100, 0));

        let ctx = Arc::new(ConnContext::new(LevelSnapshot::default()));
        drive(transport, &control, registry.clone(), ctx.clone(), 0);

        assert_eq!(alert.tally(), 0);
        assert_eq!(ctx.metrics().keep_alives, 1);
        assert!(ctx.last_report_age() < Duration::from_secs(1));
    }

    #[test]
    fn test_sequence_gap_is_counted() {
        let (registry, _reg_control) = test_registry();

        let (transport, control) = MockTransport::new();
        control.queue_report(report(10, 0, 100, 1));
        control.queue_report(report(13, 0, 200, 0)); // 缺 11、12

        let ctx = Arc::new(ConnContext::new(LevelSnapshot::default()));
        drive(transport, &control, registry, ctx.clone(), 0);

        assert_eq!(ctx.metrics().seq_gaps, 1);
    }

    #[test]
    fn test_seqno_wraparound_is_not_a_gap() {
        let (registry, _reg_control) = test_registry();

        let (transport, control) = MockTransport::new();
        control.queue_report(report(u16::MAX, 0, 100, 1));
        control.queue_report(report(0, 0, 200, 0));

        let ctx = Arc::new(ConnContext::new(LevelSnapshot::default()));
        drive(transport, &control, registry, ctx.clone(), 0);

        assert_eq!(ctx.metrics().seq_gaps, 0);
    }

    #[test]
    fn test_link_failure_sets_stop_flag() {
        let (registry, _reg_control) = test_registry();
        let (transport, control) = MockTransport::new();
        control.set_closed();

        let ctx = Arc::new(ConnContext::new(LevelSnapshot::default()));
        let stop = Arc::new(AtomicBool::new(false));
        let stop_clone = stop.clone();
        let handle = thread::spawn(move || {
            notify_loop(
                Box::new(transport),
                registry,
                ctx,
                stop_clone,
                0,
                Duration::from_secs(60),
            );
        });
        handle.join().unwrap();

        assert!(stop.load(Ordering::Acquire));
    }

    #[test]
    fn test_random_level_chain_xor_consistency() {
        // 随机电平序列下，EITHER 订阅的 tally 等于该位翻转的次数
        use rand::{Rng, SeedableRng, rngs::StdRng};

        let (registry, _reg_control) = test_registry();
        let alert = registry.add_gpio(17, Edge::Either, None).unwrap();

        let mut rng = StdRng::seed_from_u64(42);
        let (transport, control) = MockTransport::new();

        let mut level = 0u32;
        let mut flips = 0u32;
        for seq in 0..200u16 {
            let next: u32 = rng.r#gen();
            if (next ^ level) & (1 << 17) != 0 {
                flips += 1;
            }
            level = next;
            control.queue_report(report(seq, 0, seq as u32, level));
        }

        let ctx = Arc::new(ConnContext::new(LevelSnapshot::default()));
        drive(transport, &control, registry.clone(), ctx, 0);

        assert_eq!(alert.tally(), flips);
    }
}
