//! 后台读取循环模块
//!
//! 负责 RX 线程的 CAN 帧接收、分类和入箱逻辑。

use crate::mailbox::Mailbox;
use crate::metrics::InterfaceMetrics;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use talon_can::{CanError, FrameKind, RxAdapter};
use tracing::{error, trace, warn};

/// 读取循环配置
///
/// # Example
///
/// ```
/// use talon_driver::PipelineConfig;
///
/// // 使用默认配置（2ms 接收超时）
/// let config = PipelineConfig::default();
///
/// // 自定义配置
/// let config = PipelineConfig { receive_timeout_ms: 5 };
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// CAN 接收超时（毫秒）
    ///
    /// 这是读取线程唯一的阻塞点：适配器在这个上限内等待新帧。
    /// 它同时决定了取消信号的最坏响应延迟——析构会在一个超时
    /// 周期内被读取线程观察到。
    pub receive_timeout_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            receive_timeout_ms: 2,
        }
    }
}

/// RX 线程循环
///
/// 每轮迭代：检查运行标志；从适配器读一帧；按分类处理。
/// 空队列（`CanError::Timeout`）和读失败都不是致命的，循环继续；
/// 只有运行标志被清除才会退出。
///
/// # 参数
/// - `rx`: 适配器的只读半边（被本线程独占）
/// - `mailbox`: 共享帧邮箱
/// - `is_running`: 协作式取消标志
/// - `metrics`: 共享指标计数器
pub fn rx_loop(
    mut rx: impl RxAdapter,
    mailbox: Arc<Mailbox>,
    is_running: Arc<AtomicBool>,
    metrics: Arc<InterfaceMetrics>,
) {
    trace!("RX thread started");

    loop {
        // Acquire: If we see false, we must see all cleanup writes from other threads
        if !is_running.load(Ordering::Acquire) {
            trace!("RX thread: is_running flag is false, exiting");
            break;
        }

        let frame = match rx.receive() {
            Ok(frame) => {
                metrics.rx_frames_total.fetch_add(1, Ordering::Relaxed);
                frame
            },
            Err(CanError::Timeout) => {
                // 队列空是正常情况，继续轮询
                metrics.rx_timeouts.fetch_add(1, Ordering::Relaxed);
                continue;
            },
            Err(e) => {
                // 非致命：记录后继续，读循环自愈
                metrics.rx_errors.fetch_add(1, Ordering::Relaxed);
                error!("CAN receive error: {}", e);
                continue;
            },
        };

        match frame.kind {
            FrameKind::Data => {
                trace!("packet 0x{:08X}", frame.id);
                mailbox.deposit(frame);
                metrics.rx_frames_deposited.fetch_add(1, Ordering::Relaxed);
            },
            FrameKind::Status => {
                warn!("status frame (ID=0x{:X}) is not yet handled", frame.id);
            },
            FrameKind::ErrorFrame => {
                warn!("error frame (ID=0x{:X}) is not yet handled", frame.id);
            },
            FrameKind::Unknown(kind) => {
                error!("unknown frame kind 0x{:02X} (ID=0x{:X})", kind, frame.id);
            },
        }
    }
}
