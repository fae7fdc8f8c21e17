// ==========================================
// 产线设备控制系统 - 执行通道层错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 执行通道错误类型
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("设备未注册: {device_name}")]
    DeviceNotFound { device_name: String },

    #[error("远程调用失败: device={device_name}, status={status}")]
    InvocationFailed { device_name: String, status: i32 },

    #[error("执行通道异常: {0}")]
    ChannelError(String),
}
