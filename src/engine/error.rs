// ==========================================
// 产线设备控制系统 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use crate::domain::types::DeviceId;
use thiserror::Error;

/// 引擎层错误类型
///
/// 仅覆盖前置条件违反与共享状态异常；
/// 策略判定本身不产生错误（以 Option 表达无意图）
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("非法设备ID: {0} (必须为正整数)")]
    InvalidDeviceId(DeviceId),

    #[error("设备窗口表锁已中毒: {0}")]
    LockPoisoned(String),
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;
