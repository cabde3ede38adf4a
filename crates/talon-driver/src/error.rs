//! 驱动层错误类型定义

use talon_can::CanError;
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// CAN 驱动错误
    #[error("CAN driver error: {0}")]
    Can(#[from] CanError),

    /// 进程内已存在一个活动的接口实例
    #[error("CAN interface is already open")]
    AlreadyOpen,

    /// 功能未实现（流会话、总线状态查询）
    #[error("Not implemented: {0}")]
    NotImplemented(String),
}

#[cfg(test)]
mod tests {
    use super::DriverError;
    use talon_can::CanError;

    /// 测试 DriverError 的 Display 实现
    #[test]
    fn test_driver_error_display() {
        let driver_error = DriverError::Can(CanError::Timeout);
        let msg = format!("{}", driver_error);
        assert!(
            msg.contains("queue empty") || msg.contains("CAN"),
            "Can error message: {}",
            msg
        );

        let driver_error = DriverError::AlreadyOpen;
        assert_eq!(format!("{}", driver_error), "CAN interface is already open");

        let driver_error = DriverError::NotImplemented("stream sessions".to_string());
        let msg = format!("{}", driver_error);
        assert!(msg.contains("Not implemented") && msg.contains("stream sessions"));
    }

    /// 测试 From<CanError> 转换
    #[test]
    fn test_from_can_error() {
        let driver_error: DriverError = CanError::BusOff.into();
        match driver_error {
            DriverError::Can(e) => assert!(matches!(e, CanError::BusOff)),
            _ => panic!("Expected Can variant"),
        }
    }
}
