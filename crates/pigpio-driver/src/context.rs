//! 连接共享状态上下文
//!
//! 通知线程是电平快照的唯一写入者，调用方线程只读。发布走
//! `ArcSwap`，读取无锁、纳秒级返回快照副本。

use arc_swap::ArcSwap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// bank 1 电平快照
///
/// `tick` 是产生该快照的报文时间戳；初始快照（BR1 拉取）没有
/// 对应报文，tick 为 0。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LevelSnapshot {
    /// 微秒时间戳（守护进程侧，约 71.6 分钟回绕）
    pub tick: u32,
    /// bank 1 全量电平位掩码
    pub levels: u32,
}

/// 通知链路计数器（原子，仅供监控）
#[derive(Debug, Default)]
pub struct NotifyMetrics {
    pub(crate) reports_total: AtomicU64,
    pub(crate) level_changes: AtomicU64,
    pub(crate) watchdogs: AtomicU64,
    pub(crate) keep_alives: AtomicU64,
    pub(crate) events: AtomicU64,
    pub(crate) seq_gaps: AtomicU64,
    pub(crate) unknown_reports: AtomicU64,
}

/// 计数器快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub reports_total: u64,
    pub level_changes: u64,
    pub watchdogs: u64,
    pub keep_alives: u64,
    pub events: u64,
    pub seq_gaps: u64,
    pub unknown_reports: u64,
}

/// 连接共享状态
///
/// 只包含两类跨线程可变状态：电平快照（ArcSwap）与活性时钟
/// （原子毫秒计数）。订阅列表在 [`crate::AlertRegistry`] 中单独
/// 加锁管理。
pub struct ConnContext {
    levels: ArcSwap<LevelSnapshot>,
    /// 活性时钟的基准时刻（连接建立时）
    epoch: Instant,
    /// 最近一次收到报文的时刻（相对 epoch 的毫秒数）
    last_report_ms: AtomicU64,
    pub(crate) metrics: NotifyMetrics,
}

impl ConnContext {
    pub(crate) fn new(initial: LevelSnapshot) -> Self {
        Self {
            levels: ArcSwap::from_pointee(initial),
            epoch: Instant::now(),
            last_report_ms: AtomicU64::new(0),
            metrics: NotifyMetrics::default(),
        }
    }

    /// 获取电平快照（无锁）
    pub fn levels(&self) -> LevelSnapshot {
        **self.levels.load()
    }

    /// 发布新快照（仅通知线程调用）
    pub(crate) fn publish_levels(&self, snapshot: LevelSnapshot) {
        self.levels.store(Arc::new(snapshot));
    }

    /// 刷新活性时钟（任何种类的报文到达都算）
    pub(crate) fn register_report(&self) {
        let ms = self.epoch.elapsed().as_millis() as u64;
        self.last_report_ms.store(ms, Ordering::Relaxed);
    }

    /// 距最近一次报文的时长（从未收到报文则从连接建立起算）
    pub fn last_report_age(&self) -> Duration {
        let last = self.last_report_ms.load(Ordering::Relaxed);
        self.epoch.elapsed().saturating_sub(Duration::from_millis(last))
    }

    /// 获取计数器快照
    pub fn metrics(&self) -> MetricsSnapshot {
        let m = &self.metrics;
        MetricsSnapshot {
            reports_total: m.reports_total.load(Ordering::Relaxed),
            level_changes: m.level_changes.load(Ordering::Relaxed),
            watchdogs: m.watchdogs.load(Ordering::Relaxed),
            keep_alives: m.keep_alives.load(Ordering::Relaxed),
            events: m.events.load(Ordering::Relaxed),
            seq_gaps: m.seq_gaps.load(Ordering::Relaxed),
            unknown_reports: m.unknown_reports.load(Ordering::Relaxed),
        }
    }
}
