//! # Talon CAN Adapter Layer
//!
//! CAN 硬件抽象层，提供统一的 CAN 接口抽象。
//!
//! 本层不理解 Talon SRX 的协议语义，只负责把"一帧"在硬件适配器
//! 和驱动层之间搬运。上层（`talon-driver`）通过 [`CanAdapter`] /
//! [`SplittableAdapter`] 使用统一的帧类型 [`TalonFrame`]。

use std::time::Duration;
use thiserror::Error;

#[cfg(target_os = "linux")]
pub mod socketcan;

#[cfg(target_os = "linux")]
pub use socketcan::SocketCanAdapter;

#[cfg(target_os = "linux")]
pub use socketcan::{SocketCanRxAdapter, SocketCanTxAdapter};

#[cfg(feature = "mock")]
pub mod mock;

#[cfg(feature = "mock")]
pub use mock::{MockCan, MockCanHandle};

/// 适配器读到的帧分类
///
/// 对应厂商 SDK 的消息类型字段：只有数据帧会进入驱动层的邮箱，
/// 其余类型由读取线程记录后丢弃。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FrameKind {
    /// 标准数据帧
    Data,
    /// 总线/控制器状态帧（尚未处理）
    Status,
    /// 错误帧（尚未处理）
    ErrorFrame,
    /// 未知消息类型，携带适配器的原始类型字节
    Unknown(u8),
}

/// CAN 2.0 标准帧的统一抽象
///
/// # 设计特性
///
/// - **Copy trait**：零成本复制，适合高频 CAN 场景
/// - **固定 8 字节**：避免堆分配；`len` 之后的尾部字节为 0
/// - **无生命周期**：自包含数据结构，简化 API
///
/// # 不变量
///
/// `len <= 8`。所有构造路径都会把超长负载截断到 8 字节，
/// 外部输入永远不会溢出 `data` 缓冲区。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TalonFrame {
    /// 仲裁 ID（邮箱的主键）
    pub id: u32,

    /// 帧数据（固定 8 字节，未使用部分为 0）
    pub data: [u8; 8],

    /// 有效数据长度 (0-8)
    pub len: u8,

    /// 帧分类（数据/状态/错误/未知）
    pub kind: FrameKind,

    /// 硬件时间戳（微秒），0 表示不可用
    pub timestamp_us: u64,
}

impl TalonFrame {
    /// 创建标准数据帧（负载超过 8 字节时截断）
    pub fn new_data(id: u32, data: &[u8]) -> Self {
        Self::new(id, data, FrameKind::Data)
    }

    /// 通用构造器
    pub fn new(id: u32, data: &[u8], kind: FrameKind) -> Self {
        let mut fixed_data = [0u8; 8];
        let len = data.len().min(8);
        fixed_data[..len].copy_from_slice(&data[..len]);

        Self {
            id,
            data: fixed_data,
            len: len as u8,
            kind,
            timestamp_us: 0,
        }
    }

    /// 获取数据切片（只包含有效数据）
    pub fn data_slice(&self) -> &[u8] {
        &self.data[..self.len as usize]
    }

    /// 是否为可入箱的数据帧
    pub fn is_data(&self) -> bool {
        self.kind == FrameKind::Data
    }
}

/// CAN 适配层统一错误类型
#[derive(Error, Debug)]
pub enum CanError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Device Error: {0}")]
    Device(#[from] CanDeviceError),
    /// 接收队列为空（读超时）。读取线程视为正常情况，继续轮询。
    #[error("Receive queue empty")]
    Timeout,
    #[error("Bus off")]
    BusOff,
    #[error("Device not started")]
    NotStarted,
}

/// 设备/后端错误的结构化分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanDeviceErrorKind {
    Unknown,
    NotFound,
    NoDevice,
    AccessDenied,
    Busy,
    UnsupportedConfig,
    InvalidFrame,
    Backend,
}

/// 结构化设备错误
#[derive(Error, Debug, Clone)]
#[error("{kind:?}: {message}")]
pub struct CanDeviceError {
    pub kind: CanDeviceErrorKind,
    pub message: String,
}

impl CanDeviceError {
    pub fn new(kind: CanDeviceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind,
            CanDeviceErrorKind::NoDevice
                | CanDeviceErrorKind::AccessDenied
                | CanDeviceErrorKind::NotFound
        )
    }
}

impl From<String> for CanDeviceError {
    fn from(message: String) -> Self {
        Self::new(CanDeviceErrorKind::Unknown, message)
    }
}

impl From<&str> for CanDeviceError {
    fn from(message: &str) -> Self {
        Self::new(CanDeviceErrorKind::Unknown, message)
    }
}

/// 完整的 CAN 适配器（收发一体）
pub trait CanAdapter {
    fn send(&mut self, frame: TalonFrame) -> Result<(), CanError>;
    fn receive(&mut self) -> Result<TalonFrame, CanError>;
    fn set_receive_timeout(&mut self, _timeout: Duration) {}
}

/// 只读适配器（供 RX 线程独占）
pub trait RxAdapter {
    fn receive(&mut self) -> Result<TalonFrame, CanError>;
}

/// 只写适配器（供接口门面持有）
pub trait TxAdapter {
    fn send(&mut self, frame: TalonFrame) -> Result<(), CanError>;
}

/// 可分离的适配器
///
/// 把一个适配器拆成独立的 RX/TX 两半，供读取线程和发送路径
/// 并发使用。两半可以绑定到不同的物理总线段（见 SocketCAN 后端的
/// `rx_interface` / `tx_interface` 配置）。
pub trait SplittableAdapter: CanAdapter {
    type RxAdapter: RxAdapter;
    type TxAdapter: TxAdapter;
    fn split(self) -> Result<(Self::RxAdapter, Self::TxAdapter), CanError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_data_clamps_oversized_payload() {
        let payload = [0xABu8; 20];
        let frame = TalonFrame::new_data(0x123, &payload);
        assert_eq!(frame.len, 8);
        assert_eq!(frame.data, [0xAB; 8]);
        assert_eq!(frame.data_slice().len(), 8);
    }

    #[test]
    fn test_new_data_zero_pads_tail() {
        let frame = TalonFrame::new_data(0x02041880, &[1, 2, 3]);
        assert_eq!(frame.len, 3);
        assert_eq!(frame.data, [1, 2, 3, 0, 0, 0, 0, 0]);
        assert_eq!(frame.data_slice(), &[1, 2, 3]);
        assert!(frame.is_data());
    }

    #[test]
    fn test_non_data_kinds() {
        let frame = TalonFrame::new(0, &[], FrameKind::Unknown(0x42));
        assert!(!frame.is_data());
        assert_eq!(frame.kind, FrameKind::Unknown(0x42));
    }

    #[test]
    fn test_device_error_fatality() {
        let fatal = CanDeviceError::new(CanDeviceErrorKind::NoDevice, "gone");
        assert!(fatal.is_fatal());
        let transient = CanDeviceError::new(CanDeviceErrorKind::Busy, "busy");
        assert!(!transient.is_fatal());
    }
}
