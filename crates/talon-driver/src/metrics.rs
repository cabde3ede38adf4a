//! 驱动层性能指标模块
//!
//! 提供零开销的原子计数器，用于监控读写链路的健康状态。
//! 所有计数器都使用原子操作，可以在任何线程安全地读取，
//! 不会引入锁竞争。测试也用它来确认读取线程已消化注入的帧。

use std::sync::atomic::{AtomicU64, Ordering};

/// 接口实时指标
#[derive(Debug, Default)]
pub struct InterfaceMetrics {
    /// RX 适配器成功读到的总帧数（含非数据帧）
    pub rx_frames_total: AtomicU64,

    /// 存入邮箱的数据帧数
    pub rx_frames_deposited: AtomicU64,

    /// RX 空队列/超时次数（正常现象，无数据时会超时）
    pub rx_timeouts: AtomicU64,

    /// RX 读失败次数（超时除外）
    pub rx_errors: AtomicU64,

    /// TX 写出的总帧数
    pub tx_frames_total: AtomicU64,

    /// TX 写失败次数
    pub tx_errors: AtomicU64,
}

impl InterfaceMetrics {
    /// 创建新的指标实例（所有计数器初始化为 0）
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取人类可读的指标快照
    ///
    /// 快照是原子读取的；不同计数器之间可能有微小的时间差。
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            rx_frames_total: self.rx_frames_total.load(Ordering::Relaxed),
            rx_frames_deposited: self.rx_frames_deposited.load(Ordering::Relaxed),
            rx_timeouts: self.rx_timeouts.load(Ordering::Relaxed),
            rx_errors: self.rx_errors.load(Ordering::Relaxed),
            tx_frames_total: self.tx_frames_total.load(Ordering::Relaxed),
            tx_errors: self.tx_errors.load(Ordering::Relaxed),
        }
    }
}

/// 指标快照（不可变，用于读取）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub rx_frames_total: u64,
    pub rx_frames_deposited: u64,
    pub rx_timeouts: u64,
    pub rx_errors: u64,
    pub tx_frames_total: u64,
    pub tx_errors: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_counters() {
        let metrics = InterfaceMetrics::new();
        metrics.rx_frames_total.fetch_add(3, Ordering::Relaxed);
        metrics.tx_errors.fetch_add(1, Ordering::Relaxed);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.rx_frames_total, 3);
        assert_eq!(snapshot.tx_errors, 1);
        assert_eq!(snapshot.rx_frames_deposited, 0);
    }
}
