// ==========================================
// 产线设备控制系统 - 事件分类器
// ==========================================
// 职责: 将入站消息信封分派为封闭类型集合中的一种
// 说明: 优先使用显式类型判别字段，缺失时回退内容嗅探；
//       未知或畸形消息成为显式变体，由调用方丢弃并记日志，
//       绝不作为故障向上传播中断事件流
// ==========================================

use crate::domain::message::{
    DeviceErrorRecord, MessageEnvelope, ProductionKpiMessage, TelemetryMessage,
};

// ==========================================
// 分类结果
// ==========================================

/// 分类后的事件
///
/// 封闭集合，业务逻辑只消费前三种；
/// Unrecognized / ParseFailure 由分发层丢弃并记诊断
#[derive(Debug, Clone)]
pub enum ClassifiedEvent {
    /// 遥测 (仅记日志)
    Telemetry(TelemetryMessage),
    /// 设备错误 (进入紧急停机策略)
    DeviceError(DeviceErrorRecord),
    /// 生产 KPI (进入降速策略)
    ProductionKpi(ProductionKpiMessage),
    /// 无法识别的消息类型
    Unrecognized {
        /// 观测到的判别字段值（如有）
        discriminator: Option<String>,
    },
    /// 已识别类型但载荷解析失败
    ParseFailure {
        /// 目标消息类型
        kind: &'static str,
        /// 诊断信息
        reason: String,
    },
}

// ==========================================
// EventClassifier - 事件分类器
// ==========================================
pub struct EventClassifier {
    // 无状态分类器
}

impl EventClassifier {
    /// 构造函数
    pub fn new() -> Self {
        Self {}
    }

    /// 对消息信封分类
    ///
    /// 分类顺序（先匹配者胜出）:
    /// 1. 显式判别字段 messageType / errorType（传输属性或载荷字段）
    /// 2. 内容嗅探回退: 遥测标记 → 错误标记 → KPI 标记
    /// 3. 其余归为 Unrecognized
    pub fn classify(&self, envelope: &MessageEnvelope) -> ClassifiedEvent {
        if let Some(discriminator) = self.discriminator(envelope) {
            match discriminator.to_lowercase().as_str() {
                "telemetry" => return self.parse_telemetry(&envelope.payload),
                "error" | "deviceerror" => return self.parse_device_error(&envelope.payload),
                "kpi" | "productionkpi" => return self.parse_kpi(&envelope.payload),
                _ => {
                    // 判别字段存在但未知: 落入内容嗅探
                    return self.sniff(envelope, Some(discriminator));
                }
            }
        }

        self.sniff(envelope, None)
    }

    /// 提取显式类型判别字段
    ///
    /// 优先传输属性，其次载荷中的同名字段
    fn discriminator(&self, envelope: &MessageEnvelope) -> Option<String> {
        if let Some(value) = envelope
            .property("messageType")
            .or_else(|| envelope.property("errorType"))
        {
            return Some(value.to_string());
        }

        let value: serde_json::Value = serde_json::from_str(&envelope.payload).ok()?;
        value
            .get("messageType")
            .or_else(|| value.get("errorType"))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    }

    /// 内容嗅探回退
    fn sniff(&self, envelope: &MessageEnvelope, discriminator: Option<String>) -> ClassifiedEvent {
        let payload = &envelope.payload;

        if payload.contains("productionStatus") || payload.contains("temperature") {
            return self.parse_telemetry(payload);
        }

        if payload.contains("errors") || payload.contains("errorCode") {
            return self.parse_device_error(payload);
        }

        if payload.contains("goodProductionPercentage") || payload.contains("windowStart") {
            return self.parse_kpi(payload);
        }

        ClassifiedEvent::Unrecognized { discriminator }
    }

    fn parse_telemetry(&self, payload: &str) -> ClassifiedEvent {
        match serde_json::from_str::<TelemetryMessage>(payload) {
            Ok(telemetry) => match telemetry.validate() {
                Ok(()) => ClassifiedEvent::Telemetry(telemetry),
                Err(reason) => ClassifiedEvent::ParseFailure {
                    kind: "telemetry",
                    reason,
                },
            },
            Err(e) => ClassifiedEvent::ParseFailure {
                kind: "telemetry",
                reason: e.to_string(),
            },
        }
    }

    fn parse_device_error(&self, payload: &str) -> ClassifiedEvent {
        match DeviceErrorRecord::decode(payload) {
            Ok(record) => ClassifiedEvent::DeviceError(record),
            Err(reason) => ClassifiedEvent::ParseFailure {
                kind: "deviceError",
                reason,
            },
        }
    }

    fn parse_kpi(&self, payload: &str) -> ClassifiedEvent {
        match serde_json::from_str::<ProductionKpiMessage>(payload) {
            Ok(kpi) => match kpi.validate() {
                Ok(()) => ClassifiedEvent::ProductionKpi(kpi),
                Err(reason) => ClassifiedEvent::ParseFailure {
                    kind: "productionKpi",
                    reason,
                },
            },
            Err(e) => ClassifiedEvent::ParseFailure {
                kind: "productionKpi",
                reason: e.to_string(),
            },
        }
    }
}

impl Default for EventClassifier {
    fn default() -> Self {
        Self::new()
    }
}
