//! Builder 模式实现
//!
//! 提供链式构造 [`CanInterface`] 实例的便捷方式（SocketCAN 后端）。
//! 测试或自定义后端可以绕过 Builder，直接用
//! [`CanInterface::open`] 传入任意可分离适配器。

use crate::error::DriverError;
use crate::interface::CanInterface;
use crate::pipeline::PipelineConfig;

/// CanInterface Builder（链式构造）
///
/// 读路径和写路径的接口名是两个独立的配置值：在部分底盘上，
/// 驱动器反馈和控制指令走不同的物理总线段。未显式设置写接口时
/// 沿用读接口。
///
/// # Example
///
/// ```no_run
/// use talon_driver::CanInterfaceBuilder;
///
/// // 单总线拓扑
/// let iface = CanInterfaceBuilder::new()
///     .rx_interface("can0")
///     .open()
///     .unwrap();
/// ```
#[derive(Debug, Default)]
pub struct CanInterfaceBuilder {
    rx_interface: Option<String>,
    tx_interface: Option<String>,
    pipeline_config: Option<PipelineConfig>,
}

impl CanInterfaceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置读路径的接口名（默认 "can0"）
    pub fn rx_interface(mut self, interface: impl Into<String>) -> Self {
        self.rx_interface = Some(interface.into());
        self
    }

    /// 设置写路径的接口名（默认与读路径相同）
    pub fn tx_interface(mut self, interface: impl Into<String>) -> Self {
        self.tx_interface = Some(interface.into());
        self
    }

    /// 设置读取循环配置（可选）
    pub fn pipeline_config(mut self, config: PipelineConfig) -> Self {
        self.pipeline_config = Some(config);
        self
    }

    /// 打开接口并启动后台读取线程
    ///
    /// # 错误
    /// - `DriverError::Can`: 打开 SocketCAN 接口失败（致命，
    ///   接口视为未构造）
    /// - `DriverError::AlreadyOpen`: 进程内已有活动实例
    #[cfg(target_os = "linux")]
    pub fn open(self) -> Result<CanInterface, DriverError> {
        use talon_can::SocketCanAdapter;

        let rx_interface = self.rx_interface.unwrap_or_else(|| "can0".to_string());
        let tx_interface = self.tx_interface.unwrap_or_else(|| rx_interface.clone());

        let adapter = SocketCanAdapter::open(&rx_interface, &tx_interface)?;
        CanInterface::open(adapter, self.pipeline_config.unwrap_or_default())
    }

    /// 打开接口（非 Linux 平台无可用后端）
    #[cfg(not(target_os = "linux"))]
    pub fn open(self) -> Result<CanInterface, DriverError> {
        use talon_can::{CanDeviceError, CanDeviceErrorKind, CanError};

        Err(DriverError::Can(CanError::Device(CanDeviceError::new(
            CanDeviceErrorKind::UnsupportedConfig,
            "SocketCAN backend is only available on Linux",
        ))))
    }
}
