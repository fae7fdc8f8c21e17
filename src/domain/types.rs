// ==========================================
// 产线设备控制系统 - 领域类型定义
// ==========================================
// 依据: 设备侧错误寄存器位定义 (与现场 Agent 一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr};

// ==========================================
// 设备标识 (Device Id)
// ==========================================
// 正整数标识，作为所有按设备状态的稳定键
// 红线: 同一标识不会同时复用于两台逻辑设备
pub type DeviceId = i32;

// ==========================================
// 错误标志位 (Error Flags)
// ==========================================
// 固定位集，一次事件可同时携带多个标志
// 红线: EMERGENCY_STOP 不参与错误计数策略，但始终出现在错误描述中
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorFlags(u32);

impl ErrorFlags {
    /// 无错误
    pub const NONE: ErrorFlags = ErrorFlags(0);
    /// 紧急停机已激活
    pub const EMERGENCY_STOP: ErrorFlags = ErrorFlags(1);
    /// 电源故障
    pub const POWER_FAILURE: ErrorFlags = ErrorFlags(1 << 1);
    /// 传感器故障
    pub const SENSOR_FAILURE: ErrorFlags = ErrorFlags(1 << 2);
    /// 未知错误
    pub const UNKNOWN: ErrorFlags = ErrorFlags(1 << 3);

    /// 从设备上报的原始位码构造
    ///
    /// 不做位掩码收窄，保持与设备寄存器原值一致
    pub fn from_bits(bits: u32) -> Self {
        ErrorFlags(bits)
    }

    /// 原始位码
    pub fn bits(self) -> u32 {
        self.0
    }

    /// 是否无任何错误位
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// 是否包含指定标志位
    pub fn contains(self, other: ErrorFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// 可计数子集: 清除 EMERGENCY_STOP 后剩余的标志位
    ///
    /// 紧急停机本身不应再触发新的紧急停机
    pub fn countable(self) -> ErrorFlags {
        ErrorFlags(self.0 & !Self::EMERGENCY_STOP.0)
    }

    /// 生成面向用户的错误描述
    ///
    /// 描述始终包含 EMERGENCY_STOP（与计数策略无关）
    pub fn describe(self) -> String {
        if self.is_empty() {
            return "无错误".to_string();
        }

        let mut descriptions = Vec::new();

        if self.contains(Self::EMERGENCY_STOP) {
            descriptions.push("紧急停机激活");
        }
        if self.contains(Self::POWER_FAILURE) {
            descriptions.push("电源故障");
        }
        if self.contains(Self::SENSOR_FAILURE) {
            descriptions.push("传感器故障");
        }
        if self.contains(Self::UNKNOWN) {
            descriptions.push("未知错误");
        }

        descriptions.join(", ")
    }
}

impl BitOr for ErrorFlags {
    type Output = ErrorFlags;

    fn bitor(self, rhs: ErrorFlags) -> ErrorFlags {
        ErrorFlags(self.0 | rhs.0)
    }
}

impl BitAnd for ErrorFlags {
    type Output = ErrorFlags;

    fn bitand(self, rhs: ErrorFlags) -> ErrorFlags {
        ErrorFlags(self.0 & rhs.0)
    }
}

impl fmt::Display for ErrorFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "NONE");
        }

        let mut names = Vec::new();
        if self.contains(Self::EMERGENCY_STOP) {
            names.push("EMERGENCY_STOP");
        }
        if self.contains(Self::POWER_FAILURE) {
            names.push("POWER_FAILURE");
        }
        if self.contains(Self::SENSOR_FAILURE) {
            names.push("SENSOR_FAILURE");
        }
        if self.contains(Self::UNKNOWN) {
            names.push("UNKNOWN");
        }

        write!(f, "{}", names.join("|"))
    }
}

// ==========================================
// 执行意图 (Actuation Intent)
// ==========================================
// 决策输出，尚未执行的设备指令
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "intent", content = "device_id", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActuationIntent {
    /// 紧急停机
    EmergencyStop(DeviceId),
    /// 下调生产速率
    DecreaseRate(DeviceId),
    /// 复位错误状态
    ResetError(DeviceId),
}

impl ActuationIntent {
    /// 目标设备标识
    pub fn device_id(&self) -> DeviceId {
        match self {
            ActuationIntent::EmergencyStop(id) => *id,
            ActuationIntent::DecreaseRate(id) => *id,
            ActuationIntent::ResetError(id) => *id,
        }
    }

    /// 转换为字符串标识
    pub fn as_str(&self) -> &'static str {
        match self {
            ActuationIntent::EmergencyStop(_) => "EMERGENCY_STOP",
            ActuationIntent::DecreaseRate(_) => "DECREASE_RATE",
            ActuationIntent::ResetError(_) => "RESET_ERROR",
        }
    }
}

impl fmt::Display for ActuationIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.as_str(), self.device_id())
    }
}
