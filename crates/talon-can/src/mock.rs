//! Mock CAN 后端（无硬件依赖）
//!
//! 基于 crossbeam-channel 的内存适配器：测试侧通过 [`MockCanHandle`]
//! 注入"总线上到达"的帧（或读错误），并检视驱动写出的帧。
//! 读路径用 `recv_timeout` 模拟适配器的有界读超时语义。

use crate::{
    CanAdapter, CanDeviceError, CanDeviceErrorKind, CanError, RxAdapter, SplittableAdapter,
    TalonFrame, TxAdapter,
};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// 内存 Mock 适配器
pub struct MockCan {
    frame_rx: Receiver<Result<TalonFrame, CanError>>,
    sent_tx: Sender<TalonFrame>,
    fail_writes: Arc<AtomicBool>,
    read_timeout: Duration,
}

/// 测试侧的控制句柄
///
/// 与 [`MockCan`]（及其分离出的两半）共享通道；Drop 后适配器
/// 的读写会报告 `NoDevice`。
pub struct MockCanHandle {
    frame_tx: Sender<Result<TalonFrame, CanError>>,
    sent_rx: Receiver<TalonFrame>,
    fail_writes: Arc<AtomicBool>,
}

impl MockCan {
    /// 创建一对（适配器，控制句柄）
    pub fn new() -> (Self, MockCanHandle) {
        let (frame_tx, frame_rx) = unbounded();
        let (sent_tx, sent_rx) = unbounded();
        let fail_writes = Arc::new(AtomicBool::new(false));

        let adapter = Self {
            frame_rx,
            sent_tx,
            fail_writes: fail_writes.clone(),
            read_timeout: Duration::from_millis(2),
        };
        let handle = MockCanHandle {
            frame_tx,
            sent_rx,
            fail_writes,
        };
        (adapter, handle)
    }
}

impl MockCanHandle {
    /// 注入一帧（读取线程将在下一次 `receive` 中收到）
    pub fn push_frame(&self, frame: TalonFrame) {
        let _ = self.frame_tx.send(Ok(frame));
    }

    /// 注入一次读失败（非超时）
    pub fn push_read_error(&self, error: CanError) {
        let _ = self.frame_tx.send(Err(error));
    }

    /// 让后续写操作失败/恢复
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Relaxed);
    }

    /// 取走一帧已写出的帧（非阻塞）
    pub fn take_sent(&self) -> Option<TalonFrame> {
        self.sent_rx.try_recv().ok()
    }

    /// 等待一帧写出（带超时）
    pub fn wait_sent(&self, timeout: Duration) -> Option<TalonFrame> {
        self.sent_rx.recv_timeout(timeout).ok()
    }
}

fn handle_gone() -> CanError {
    CanError::Device(CanDeviceError::new(
        CanDeviceErrorKind::NoDevice,
        "mock handle dropped",
    ))
}

fn receive_from(
    frame_rx: &Receiver<Result<TalonFrame, CanError>>,
    timeout: Duration,
) -> Result<TalonFrame, CanError> {
    match frame_rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => Err(CanError::Timeout),
        Err(RecvTimeoutError::Disconnected) => Err(handle_gone()),
    }
}

fn send_into(
    sent_tx: &Sender<TalonFrame>,
    fail_writes: &AtomicBool,
    frame: TalonFrame,
) -> Result<(), CanError> {
    if fail_writes.load(Ordering::Relaxed) {
        return Err(CanError::Device(CanDeviceError::new(
            CanDeviceErrorKind::Backend,
            "injected write failure",
        )));
    }
    sent_tx.send(frame).map_err(|_| handle_gone())
}

impl CanAdapter for MockCan {
    fn send(&mut self, frame: TalonFrame) -> Result<(), CanError> {
        send_into(&self.sent_tx, &self.fail_writes, frame)
    }

    fn receive(&mut self) -> Result<TalonFrame, CanError> {
        receive_from(&self.frame_rx, self.read_timeout)
    }

    fn set_receive_timeout(&mut self, timeout: Duration) {
        self.read_timeout = timeout;
    }
}

/// Mock 的只读半边
pub struct MockRxAdapter {
    frame_rx: Receiver<Result<TalonFrame, CanError>>,
    read_timeout: Duration,
}

/// Mock 的只写半边
pub struct MockTxAdapter {
    sent_tx: Sender<TalonFrame>,
    fail_writes: Arc<AtomicBool>,
}

impl RxAdapter for MockRxAdapter {
    fn receive(&mut self) -> Result<TalonFrame, CanError> {
        receive_from(&self.frame_rx, self.read_timeout)
    }
}

impl TxAdapter for MockTxAdapter {
    fn send(&mut self, frame: TalonFrame) -> Result<(), CanError> {
        send_into(&self.sent_tx, &self.fail_writes, frame)
    }
}

impl SplittableAdapter for MockCan {
    type RxAdapter = MockRxAdapter;
    type TxAdapter = MockTxAdapter;

    fn split(self) -> Result<(MockRxAdapter, MockTxAdapter), CanError> {
        Ok((
            MockRxAdapter {
                frame_rx: self.frame_rx,
                read_timeout: self.read_timeout,
            },
            MockTxAdapter {
                sent_tx: self.sent_tx,
                fail_writes: self.fail_writes,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_round_trip() {
        let (mut can, handle) = MockCan::new();

        handle.push_frame(TalonFrame::new_data(0x123, &[1, 2, 3]));
        let frame = can.receive().unwrap();
        assert_eq!(frame.id, 0x123);
        assert_eq!(frame.data_slice(), &[1, 2, 3]);

        can.send(TalonFrame::new_data(0x456, &[9])).unwrap();
        let sent = handle.take_sent().unwrap();
        assert_eq!(sent.id, 0x456);
    }

    #[test]
    fn test_mock_empty_queue_is_timeout() {
        let (mut can, _handle) = MockCan::new();
        can.set_receive_timeout(Duration::from_millis(1));
        assert!(matches!(can.receive(), Err(CanError::Timeout)));
    }

    #[test]
    fn test_mock_write_failure_injection() {
        let (mut can, handle) = MockCan::new();
        handle.set_fail_writes(true);
        assert!(matches!(
            can.send(TalonFrame::new_data(1, &[])),
            Err(CanError::Device(_))
        ));
        handle.set_fail_writes(false);
        assert!(can.send(TalonFrame::new_data(1, &[])).is_ok());
    }

    #[test]
    fn test_mock_split_halves_share_channels() {
        let (can, handle) = MockCan::new();
        let (mut rx, mut tx) = can.split().unwrap();

        handle.push_frame(TalonFrame::new_data(7, &[0xFF]));
        assert_eq!(rx.receive().unwrap().id, 7);

        tx.send(TalonFrame::new_data(8, &[])).unwrap();
        assert_eq!(handle.take_sent().unwrap().id, 8);
    }
}
