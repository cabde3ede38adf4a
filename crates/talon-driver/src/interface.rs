//! 接口门面模块
//!
//! 提供对外的 [`CanInterface`] 结构体，封装后台读取线程和
//! 邮箱同步细节。进程内同一时刻至多存在一个活动实例，由显式的
//! 工厂守卫保证，不依赖全局单例。

use crate::error::DriverError;
use crate::mailbox::Mailbox;
use crate::metrics::{InterfaceMetrics, MetricsSnapshot};
use crate::pipeline::{PipelineConfig, rx_loop};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{JoinHandle, spawn};
use std::time::Duration;
use talon_can::{SplittableAdapter, TalonFrame, TxAdapter};
use tracing::{error, info, trace};

/// 进程级工厂守卫：同一时刻只允许一个活动实例
static INTERFACE_OPEN: AtomicBool = AtomicBool::new(false);

/// Extension trait for timeout-capable thread joins
trait JoinTimeout {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()>;
}

impl<T: Send + 'static> JoinTimeout for JoinHandle<T> {
    fn join_timeout(self, timeout: Duration) -> std::thread::Result<()> {
        use std::sync::mpsc;

        let (tx, rx) = mpsc::channel();

        // Spawn a watchdog thread that joins the target thread
        spawn(move || {
            let result = self.join();
            // Send result (ignore send errors - receiver may have timed out)
            let _ = tx.send(result);
        });

        match rx.recv_timeout(timeout) {
            Ok(join_result) => join_result.map(|_| ()),
            Err(mpsc::RecvTimeoutError::Timeout) => {
                // Timeout: watchdog thread continues running
                // This is acceptable - OS will clean up on process exit
                Err(Box::new(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "Thread join timeout",
                )))
            },
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                Err(Box::new(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "Thread panicked during join",
                )))
            },
        }
    }
}

/// 流会话句柄（保留的公共契约，当前不会发出任何有效句柄）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSessionHandle(pub u32);

/// 总线状态查询结果（保留的公共契约，当前不可用）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanStatus {
    pub percent_bus_utilization: f32,
    pub bus_off_count: u32,
    pub tx_full_count: u32,
    pub receive_error_count: u32,
    pub transmit_error_count: u32,
}

/// Talon CAN 接口（对外 API）
///
/// 构造时分离适配器并启动后台读取线程；析构时清除运行标志、
/// 等待线程退出，再释放工厂守卫。调用方的 `send` / `receive`
/// 都是非阻塞的：前者至多一次适配器写，后者只有一次锁获取。
pub struct CanInterface {
    /// 适配器的只写半边（与读取线程物理隔离）
    tx: Mutex<Box<dyn TxAdapter + Send>>,
    /// 共享帧邮箱
    mailbox: Arc<Mailbox>,
    /// 运行标志（协作式取消，读取线程每轮检查）
    is_running: Arc<AtomicBool>,
    /// RX 线程句柄（Drop 时 join）
    rx_thread: Option<JoinHandle<()>>,
    /// 性能指标（原子计数器）
    metrics: Arc<InterfaceMetrics>,
}

impl CanInterface {
    /// 打开接口并启动后台读取线程
    ///
    /// # 参数
    /// - `can`: 可分离的 CAN 适配器（会被消费；RX 半边移入读取线程）
    /// - `config`: 读取循环配置
    ///
    /// # 错误
    /// - [`DriverError::AlreadyOpen`]: 进程内已有活动实例，原实例不受影响
    /// - [`DriverError::Can`]: 适配器分离/初始化失败——此时守卫已释放，
    ///   没有读取线程残留
    pub fn open<C>(mut can: C, config: PipelineConfig) -> Result<Self, DriverError>
    where
        C: SplittableAdapter + Send + 'static,
        C::RxAdapter: Send + 'static,
        C::TxAdapter: Send + 'static,
    {
        if INTERFACE_OPEN
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            error!("trying to open an already open CAN interface!");
            return Err(DriverError::AlreadyOpen);
        }

        can.set_receive_timeout(Duration::from_millis(config.receive_timeout_ms));

        let (rx, tx) = match can.split() {
            Ok(halves) => halves,
            Err(e) => {
                INTERFACE_OPEN.store(false, Ordering::Release);
                return Err(e.into());
            },
        };

        let mailbox = Arc::new(Mailbox::new());
        let is_running = Arc::new(AtomicBool::new(true));
        let metrics = Arc::new(InterfaceMetrics::new());

        let mailbox_rx = mailbox.clone();
        let is_running_rx = is_running.clone();
        let metrics_rx = metrics.clone();
        let rx_thread = spawn(move || {
            rx_loop(rx, mailbox_rx, is_running_rx, metrics_rx);
        });

        info!("CAN interface opened");

        Ok(Self {
            tx: Mutex::new(Box::new(tx)),
            mailbox,
            is_running,
            rx_thread: Some(rx_thread),
            metrics,
        })
    }

    /// 发送一帧
    ///
    /// # 参数
    /// - `arbitration_id`: 仲裁 ID
    /// - `data`: 负载，超过 8 字节的部分被截断
    /// - `period_ms`: 厂商接口的周期参数。**0 表示不安排发送**，
    ///   调用直接成功返回且不写总线；非 0 时执行一次写。周期性
    ///   重发调度不在本层实现。
    ///
    /// # 错误
    /// - [`DriverError::Can`]: 适配器写失败（瞬态，不影响读取线程）
    pub fn send(
        &self,
        arbitration_id: u32,
        data: &[u8],
        period_ms: i32,
    ) -> Result<(), DriverError> {
        if period_ms == 0 {
            trace!(
                "send with period_ms == 0, no frame written (ID=0x{:X})",
                arbitration_id
            );
            return Ok(());
        }

        let frame = TalonFrame::new_data(arbitration_id, data);
        match self.tx.lock().send(frame) {
            Ok(()) => {
                self.metrics.tx_frames_total.fetch_add(1, Ordering::Relaxed);
                Ok(())
            },
            Err(e) => {
                self.metrics.tx_errors.fetch_add(1, Ordering::Relaxed);
                error!("unable to send CAN frame: {}", e);
                Err(e.into())
            },
        }
    }

    /// 取走指定仲裁 ID 的最新一帧
    ///
    /// `id_mask` 是保留参数（厂商接口的掩码过滤），当前不参与匹配。
    ///
    /// 返回 `None` 表示没有待取的帧——这是预期的空轮询结果，
    /// 与硬件故障无关。同一帧不会被返回两次。
    pub fn receive(&self, arbitration_id: u32, _id_mask: u32) -> Option<TalonFrame> {
        self.mailbox.take(arbitration_id)
    }

    /// 打开流会话——公共契约的一部分，当前总是失败
    pub fn open_stream_session(
        &self,
        _arbitration_id: u32,
        _id_mask: u32,
        _max_frames: u32,
    ) -> Result<StreamSessionHandle, DriverError> {
        Err(DriverError::NotImplemented("stream sessions".to_string()))
    }

    /// 关闭流会话——公共契约的一部分，当前总是失败
    pub fn close_stream_session(
        &self,
        _session: StreamSessionHandle,
    ) -> Result<(), DriverError> {
        Err(DriverError::NotImplemented("stream sessions".to_string()))
    }

    /// 读取流会话——公共契约的一部分，当前总是失败
    pub fn read_stream_session(
        &self,
        _session: StreamSessionHandle,
        _max_frames: u32,
    ) -> Result<Vec<TalonFrame>, DriverError> {
        Err(DriverError::NotImplemented("stream sessions".to_string()))
    }

    /// 查询总线状态——公共契约的一部分，当前总是失败
    pub fn can_status(&self) -> Result<CanStatus, DriverError> {
        Err(DriverError::NotImplemented("bus status query".to_string()))
    }

    /// 获取性能指标快照
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// 读取线程是否存活
    pub fn is_healthy(&self) -> bool {
        self.rx_thread.as_ref().map(|h| !h.is_finished()).unwrap_or(false)
    }
}

impl Drop for CanInterface {
    fn drop(&mut self) {
        // 设置运行标志为 false，通知读取线程退出
        // 使用 Release 确保所有之前的写入对其他线程可见
        self.is_running.store(false, Ordering::Release);

        // 等待 RX 线程退出；join 有上限，即使适配器读卡死也不会死锁
        let join_timeout = Duration::from_secs(2);
        if let Some(handle) = self.rx_thread.take()
            && let Err(_e) = handle.join_timeout(join_timeout)
        {
            error!(
                "RX thread panicked or failed to shut down within {:?}",
                join_timeout
            );
        }

        // 守卫最后释放：下一个实例可以在本实例完全停止后打开
        INTERFACE_OPEN.store(false, Ordering::Release);
        info!("CAN interface closed");
    }
}
