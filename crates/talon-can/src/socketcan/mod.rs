//! SocketCAN 后端（Linux）
//!
//! PCAN 等厂商适配器在 Linux 部署下的替身。读路径和写路径持有
//! **两个独立的 socket**：在真实底盘上，驱动器反馈和控制指令可能
//! 走不同的物理总线段，所以 `rx_interface` 和 `tx_interface` 是两个
//! 独立的配置值，不做静默合并。
//!
//! # 设计原则
//!
//! - **严格使用超时**：读路径依赖 `SO_RCVTIMEO`，写路径依赖
//!   `SO_SNDTIMEO`，不使用 `O_NONBLOCK` + `poll`
//! - **FD 生命周期**：通过 RAII 自动管理，无需手动关闭
//! - **线程安全**：分离出的 RX 和 TX 适配器可以在不同线程中并发使用

use crate::{
    CanAdapter, CanDeviceError, CanDeviceErrorKind, CanError, FrameKind, RxAdapter,
    SplittableAdapter, TalonFrame, TxAdapter,
};
use socketcan::{
    BlockingCan, CanError as SocketCanError, CanFrame, CanSocket, EmbeddedFrame, ExtendedId,
    Frame, Socket, StandardId,
};
use std::time::Duration;
use tracing::{trace, warn};

/// 默认读超时（有界轮询，而非忙等）
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(2);

/// 写超时（快速失败，避免总线错误时无限阻塞）
const WRITE_TIMEOUT: Duration = Duration::from_millis(5);

/// 双 socket 的 SocketCAN 适配器
pub struct SocketCanAdapter {
    rx_socket: CanSocket,
    tx_socket: CanSocket,
}

impl SocketCanAdapter {
    /// 打开适配器
    ///
    /// # 参数
    /// - `rx_interface`: 读路径的接口名（如 "can0"）
    /// - `tx_interface`: 写路径的接口名；单总线拓扑下传同一个名字
    ///
    /// # 错误
    /// - `CanError::Device(NotFound)`: 接口不存在或无法打开
    /// - `CanError::Io`: 设置 socket 超时失败
    pub fn open(rx_interface: &str, tx_interface: &str) -> Result<Self, CanError> {
        let rx_socket = CanSocket::open(rx_interface).map_err(|e| {
            CanError::Device(CanDeviceError::new(
                CanDeviceErrorKind::NotFound,
                format!("Failed to open SocketCAN interface {rx_interface}: {e}"),
            ))
        })?;
        rx_socket.set_read_timeout(DEFAULT_READ_TIMEOUT).map_err(|e| {
            CanError::Io(std::io::Error::other(format!(
                "Failed to set read timeout on {rx_interface}: {e}"
            )))
        })?;

        let tx_socket = CanSocket::open(tx_interface).map_err(|e| {
            CanError::Device(CanDeviceError::new(
                CanDeviceErrorKind::NotFound,
                format!("Failed to open SocketCAN interface {tx_interface}: {e}"),
            ))
        })?;
        tx_socket.set_write_timeout(WRITE_TIMEOUT).map_err(|e| {
            CanError::Io(std::io::Error::other(format!(
                "Failed to set write timeout on {tx_interface}: {e}"
            )))
        })?;

        trace!(
            "SocketCAN adapter opened (rx={}, tx={})",
            rx_interface, tx_interface
        );

        Ok(Self {
            rx_socket,
            tx_socket,
        })
    }
}

/// 把 socketcan 帧转换为 [`TalonFrame`]
///
/// 错误帧不在这里丢弃：映射为 `Status` / `ErrorFrame` 分类，
/// 由读取线程统一记录。
fn convert_frame(frame: CanFrame) -> Result<TalonFrame, CanError> {
    match frame {
        CanFrame::Data(data_frame) => {
            // raw_id() 返回包含标志位的完整 ID，按帧格式掩掉标志位
            let id = if data_frame.is_extended() {
                data_frame.raw_id() & 0x1FFF_FFFF
            } else {
                data_frame.raw_id() & 0x7FF
            };
            Ok(TalonFrame::new_data(id, data_frame.data()))
        }
        CanFrame::Remote(remote_frame) => {
            // RTR 帧在 Talon 总线上不使用
            Ok(TalonFrame::new(
                remote_frame.raw_id() & 0x1FFF_FFFF,
                &[],
                FrameKind::Unknown(0x01),
            ))
        }
        CanFrame::Error(error_frame) => {
            let id = error_frame.raw_id() & 0x1FFF_FFFF;
            match SocketCanError::from(error_frame) {
                SocketCanError::BusOff => Err(CanError::BusOff),
                SocketCanError::ControllerProblem(problem) => {
                    warn!("CAN controller problem: {}", problem);
                    Ok(TalonFrame::new(id, &[], FrameKind::Status))
                }
                _ => Ok(TalonFrame::new(id, &[], FrameKind::ErrorFrame)),
            }
        }
    }
}

fn convert_read_error(e: std::io::Error) -> CanError {
    match e.kind() {
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut => CanError::Timeout,
        _ => CanError::Io(e),
    }
}

/// 把 [`TalonFrame`] 转换为 socketcan 帧
///
/// Talon 的仲裁 ID 是 29 位（设备号编码在低位），超出标准帧
/// 范围的 ID 自动走扩展帧。
fn to_socketcan_frame(frame: TalonFrame) -> Result<CanFrame, CanError> {
    if frame.id > 0x7FF {
        ExtendedId::new(frame.id)
            .and_then(|id| CanFrame::new(id, frame.data_slice()))
            .ok_or_else(|| {
                CanError::Device(
                    format!("Failed to create extended frame with ID 0x{:X}", frame.id).into(),
                )
            })
    } else {
        StandardId::new(frame.id as u16)
            .and_then(|id| CanFrame::new(id, frame.data_slice()))
            .ok_or_else(|| {
                CanError::Device(
                    format!("Failed to create standard frame with ID 0x{:X}", frame.id).into(),
                )
            })
    }
}

fn transmit(socket: &mut CanSocket, frame: TalonFrame) -> Result<(), CanError> {
    let can_frame = to_socketcan_frame(frame)?;
    socket.transmit(&can_frame).map_err(|e| {
        if let socketcan::Error::Io(ref io_err) = e
            && (io_err.kind() == std::io::ErrorKind::TimedOut
                || io_err.kind() == std::io::ErrorKind::WouldBlock)
        {
            return CanError::Timeout;
        }
        CanError::Io(std::io::Error::other(format!(
            "SocketCAN transmit error: {e}"
        )))
    })?;
    trace!("TX: Sent CAN frame: ID=0x{:X}, len={}", frame.id, frame.len);
    Ok(())
}

impl CanAdapter for SocketCanAdapter {
    fn send(&mut self, frame: TalonFrame) -> Result<(), CanError> {
        transmit(&mut self.tx_socket, frame)
    }

    fn receive(&mut self) -> Result<TalonFrame, CanError> {
        let frame = self.rx_socket.read_frame().map_err(convert_read_error)?;
        convert_frame(frame)
    }

    fn set_receive_timeout(&mut self, timeout: Duration) {
        if let Err(e) = self.rx_socket.set_read_timeout(timeout) {
            warn!("Failed to set read timeout: {}", e);
        }
    }
}

/// 只读适配器（用于 RX 线程）
pub struct SocketCanRxAdapter {
    socket: CanSocket,
}

impl RxAdapter for SocketCanRxAdapter {
    fn receive(&mut self) -> Result<TalonFrame, CanError> {
        let frame = self.socket.read_frame().map_err(convert_read_error)?;
        let frame = convert_frame(frame)?;
        trace!(
            "RX: Received CAN frame: ID=0x{:X}, len={}",
            frame.id, frame.len
        );
        Ok(frame)
    }
}

/// 只写适配器（由接口门面持有）
pub struct SocketCanTxAdapter {
    socket: CanSocket,
}

impl TxAdapter for SocketCanTxAdapter {
    fn send(&mut self, frame: TalonFrame) -> Result<(), CanError> {
        transmit(&mut self.socket, frame)
    }
}

impl SplittableAdapter for SocketCanAdapter {
    type RxAdapter = SocketCanRxAdapter;
    type TxAdapter = SocketCanTxAdapter;

    /// 分离为独立的 RX/TX 两半
    ///
    /// 读写本来就持有各自的 socket，分离只是移交所有权，
    /// 不涉及 `dup()`，也没有共享文件状态标志的陷阱。
    fn split(self) -> Result<(SocketCanRxAdapter, SocketCanTxAdapter), CanError> {
        Ok((
            SocketCanRxAdapter {
                socket: self.rx_socket,
            },
            SocketCanTxAdapter {
                socket: self.tx_socket,
            },
        ))
    }
}
