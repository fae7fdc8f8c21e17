// ==========================================
// 产线设备控制系统 - 入站消息形态
// ==========================================
// 职责: 定义传输层投递的已反序列化消息结构
// 说明: 实时错误事件与批量聚合错误使用不同编码，
//       统一解码为 DeviceErrorRecord 后才进入策略层
// ==========================================

use crate::domain::types::{DeviceId, ErrorFlags};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ==========================================
// 消息信封 (Message Envelope)
// ==========================================

/// 传输层消息信封
///
/// properties 为传输属性（如 messageType），payload 为原始 JSON 载荷
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageEnvelope {
    /// 传输属性
    #[serde(default)]
    pub properties: HashMap<String, String>,
    /// 原始载荷
    pub payload: String,
}

impl MessageEnvelope {
    /// 仅由载荷构造信封（无传输属性）
    pub fn from_payload(payload: impl Into<String>) -> Self {
        Self {
            properties: HashMap::new(),
            payload: payload.into(),
        }
    }

    /// 附加一个传输属性
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// 读取传输属性
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(|s| s.as_str())
    }
}

// ==========================================
// 遥测消息 (Telemetry)
// ==========================================

/// 设备遥测消息
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryMessage {
    pub device_id: DeviceId,
    pub production_status: String,
    #[serde(default)]
    pub workorder_id: Option<String>,
    pub good_count: i64,
    pub bad_count: i64,
    pub temperature: f64,
    pub timestamp: DateTime<Utc>,
}

impl TelemetryMessage {
    /// 边界校验
    ///
    /// # 返回
    /// - Err(String): 前置条件违反说明
    pub fn validate(&self) -> Result<(), String> {
        if self.device_id <= 0 {
            return Err(format!("非法设备ID: {}", self.device_id));
        }
        Ok(())
    }
}

// ==========================================
// 设备错误消息 (Device Error)
// ==========================================

/// 实时错误事件 (设备 Agent 直发)
///
/// errors 为人读描述串，errorCode 为位码；解码以 errorCode 为准
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceErrorEvent {
    pub device_id: DeviceId,
    pub error_type: String,
    pub errors: String,
    pub error_code: u32,
    pub timestamp: DateTime<Utc>,
}

/// 批量聚合错误 (流式聚合输出)
///
/// errors 直接为位码
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceErrorAggregate {
    pub device_id: DeviceId,
    pub errors: u32,
    pub timestamp: DateTime<Utc>,
}

/// 统一错误记录
///
/// 两种编码解码后的唯一形态，策略层只消费此类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceErrorRecord {
    pub device_id: DeviceId,
    pub flags: ErrorFlags,
    pub timestamp: DateTime<Utc>,
}

impl DeviceErrorRecord {
    /// 从实时错误事件转换
    pub fn from_event(event: &DeviceErrorEvent) -> Self {
        Self {
            device_id: event.device_id,
            flags: ErrorFlags::from_bits(event.error_code),
            timestamp: event.timestamp,
        }
    }

    /// 从批量聚合错误转换
    pub fn from_aggregate(aggregate: &DeviceErrorAggregate) -> Self {
        Self {
            device_id: aggregate.device_id,
            flags: ErrorFlags::from_bits(aggregate.errors),
            timestamp: aggregate.timestamp,
        }
    }

    /// 从 JSON 载荷解码
    ///
    /// 先尝试实时事件编码，再尝试批量聚合编码
    ///
    /// # 返回
    /// - Err(String): 两种编码均无法解析时的诊断信息
    pub fn decode(payload: &str) -> Result<Self, String> {
        if let Ok(event) = serde_json::from_str::<DeviceErrorEvent>(payload) {
            let record = Self::from_event(&event);
            record.validate()?;
            return Ok(record);
        }

        match serde_json::from_str::<DeviceErrorAggregate>(payload) {
            Ok(aggregate) => {
                let record = Self::from_aggregate(&aggregate);
                record.validate()?;
                Ok(record)
            }
            Err(e) => Err(format!("错误事件载荷无法解析: {}", e)),
        }
    }

    /// 边界校验
    pub fn validate(&self) -> Result<(), String> {
        if self.device_id <= 0 {
            return Err(format!("非法设备ID: {}", self.device_id));
        }
        Ok(())
    }
}

// ==========================================
// 生产 KPI 消息 (Production KPI)
// ==========================================

/// 生产效率 KPI 样本
///
/// 无状态样本，按事件评估后即丢弃
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionKpiMessage {
    pub device_id: DeviceId,
    pub good_production_percentage: f64,
    pub total_good_count: i64,
    pub total_bad_count: i64,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
}

impl ProductionKpiMessage {
    /// 边界校验
    ///
    /// 效率百分比必须落在 [0, 100]
    pub fn validate(&self) -> Result<(), String> {
        if self.device_id <= 0 {
            return Err(format!("非法设备ID: {}", self.device_id));
        }
        if !(0.0..=100.0).contains(&self.good_production_percentage) {
            return Err(format!(
                "效率百分比越界: {}",
                self.good_production_percentage
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_realtime_error_event() {
        let payload = r#"{
            "deviceId": 7,
            "errorType": "deviceError",
            "errors": "EmergencyStop, PowerFailure",
            "errorCode": 3,
            "timestamp": "2026-08-06T08:00:00.000Z"
        }"#;

        let record = DeviceErrorRecord::decode(payload).unwrap();
        assert_eq!(record.device_id, 7);
        assert!(record.flags.contains(ErrorFlags::EMERGENCY_STOP));
        assert!(record.flags.contains(ErrorFlags::POWER_FAILURE));
    }

    #[test]
    fn test_decode_aggregate_error_message() {
        let payload = r#"{
            "deviceId": 9,
            "errors": 4,
            "timestamp": "2026-08-06T08:00:00.000Z"
        }"#;

        let record = DeviceErrorRecord::decode(payload).unwrap();
        assert_eq!(record.device_id, 9);
        assert_eq!(record.flags, ErrorFlags::SENSOR_FAILURE);
    }

    #[test]
    fn test_decode_malformed_payload() {
        let result = DeviceErrorRecord::decode("{ not json");
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_rejects_nonpositive_device_id() {
        let payload = r#"{
            "deviceId": 0,
            "errors": 2,
            "timestamp": "2026-08-06T08:00:00.000Z"
        }"#;

        let result = DeviceErrorRecord::decode(payload);
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("非法设备ID"));
    }

    #[test]
    fn test_kpi_validate_rejects_out_of_range() {
        let payload = r#"{
            "deviceId": 7,
            "goodProductionPercentage": 105.0,
            "totalGoodCount": 100,
            "totalBadCount": 5,
            "windowStart": "2026-08-06T08:00:00.000Z",
            "windowEnd": "2026-08-06T08:05:00.000Z"
        }"#;

        let kpi: ProductionKpiMessage = serde_json::from_str(payload).unwrap();
        assert!(kpi.validate().is_err());
    }

    #[test]
    fn test_telemetry_optional_workorder() {
        let payload = r#"{
            "deviceId": 3,
            "productionStatus": "Running",
            "goodCount": 120,
            "badCount": 4,
            "temperature": 67.5,
            "timestamp": "2026-08-06T08:00:00.000Z"
        }"#;

        let telemetry: TelemetryMessage = serde_json::from_str(payload).unwrap();
        assert!(telemetry.workorder_id.is_none());
        assert!(telemetry.validate().is_ok());
    }

    #[test]
    fn test_envelope_property_access() {
        let envelope = MessageEnvelope::from_payload("{}")
            .with_property("messageType", "telemetry");

        assert_eq!(envelope.property("messageType"), Some("telemetry"));
        assert_eq!(envelope.property("errorType"), None);
    }
}
