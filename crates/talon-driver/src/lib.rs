//! 驱动层模块
//!
//! 本模块提供 Talon SRX 电机控制器的 CAN 帧收发驱动，包括：
//! - 帧邮箱（每个仲裁 ID 保留最新一帧，取走即清空）
//! - 后台读取线程（协作式取消）
//! - 接口门面（生命周期 / send / receive / 未实现的流会话桩）
//!
//! # 使用场景
//!
//! 上层电机控制逻辑通过 [`CanInterface`] 轮询各仲裁 ID 的最新反馈帧，
//! 并直接写出控制帧。帧负载的解释不属于本层。

mod builder;
mod error;
mod interface;
pub mod mailbox;
pub mod metrics;
pub mod pipeline;

pub use builder::CanInterfaceBuilder;
pub use error::DriverError;
pub use interface::{CanInterface, CanStatus, StreamSessionHandle};
pub use mailbox::Mailbox;
pub use metrics::{InterfaceMetrics, MetricsSnapshot};
pub use pipeline::{PipelineConfig, rx_loop};
