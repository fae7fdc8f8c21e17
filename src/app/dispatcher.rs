// ==========================================
// 产线设备控制系统 - 事件分发服务
// ==========================================
// 依据: 业务规则3 (任何设备错误都发出告警通知)
// ==========================================
// 职责: 串联分类器 → 决策引擎 → 执行通道
// 说明: 单事件失败均为局部失败——畸形/未知消息丢弃并记诊断，
//       指令下发失败上抛给调用方记告警；任何一种都不中断事件流。
//       错误事件一经观测即入窗口，与下发结果无关，
//       保留"观测到什么 vs 执行了什么"的审计一致性
// ==========================================

use crate::domain::message::{MessageEnvelope, ProductionKpiMessage};
use crate::domain::types::{ActuationIntent, DeviceId};
use crate::engine::classifier::{ClassifiedEvent, EventClassifier};
use crate::engine::decision::DecisionEngine;
use crate::engine::error::EngineError;
use crate::gateway::{ActuationGateway, GatewayError};
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;

/// 分发层错误类型
///
/// 仅覆盖需要上抛的失败；消息级丢弃以 DispatchOutcome::Dropped 表达
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("决策引擎内部错误: {0}")]
    Engine(#[from] EngineError),

    #[error("指令下发失败: {0}")]
    Actuation(#[from] GatewayError),
}

/// 单事件分发结果
#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    /// 遥测已记录
    TelemetryLogged { device_id: DeviceId },
    /// 错误事件已评估
    ErrorEvaluated {
        device_id: DeviceId,
        intent: Option<ActuationIntent>,
    },
    /// KPI 样本已评估
    KpiEvaluated {
        device_id: DeviceId,
        intent: Option<ActuationIntent>,
    },
    /// 消息已丢弃（未知类型或解析失败）
    Dropped { reason: String },
}

// ==========================================
// EventDispatcher - 事件分发服务
// ==========================================
pub struct EventDispatcher {
    classifier: EventClassifier,
    engine: Arc<DecisionEngine>,
    gateway: Arc<dyn ActuationGateway>,
}

impl EventDispatcher {
    /// 创建新的事件分发服务
    pub fn new(engine: Arc<DecisionEngine>, gateway: Arc<dyn ActuationGateway>) -> Self {
        Self {
            classifier: EventClassifier::new(),
            engine,
            gateway,
        }
    }

    /// 处理单条入站消息
    ///
    /// 窗口定位采用处理时刻（而非事件自带时间戳）
    ///
    /// # 返回
    /// - Ok(DispatchOutcome): 处理结果（含丢弃）
    /// - Err(DispatchError): 需上抛记告警的失败（下发失败、引擎内部错误）
    pub async fn handle_envelope(
        &self,
        envelope: &MessageEnvelope,
    ) -> Result<DispatchOutcome, DispatchError> {
        match self.classifier.classify(envelope) {
            ClassifiedEvent::Telemetry(telemetry) => {
                tracing::info!(
                    "收到遥测: 设备 {} 状态 {}, 温度 {:.1}°C",
                    telemetry.device_id,
                    telemetry.production_status,
                    telemetry.temperature
                );
                Ok(DispatchOutcome::TelemetryLogged {
                    device_id: telemetry.device_id,
                })
            }

            ClassifiedEvent::DeviceError(record) => {
                // 业务规则3: 任何设备错误都发出告警（含紧急停机标志）
                tracing::warn!(
                    "设备错误告警: 设备 {} 错误状态: {} ({}), 时刻: {}",
                    record.device_id,
                    record.flags.describe(),
                    record.flags,
                    record.timestamp.format("%Y-%m-%d %H:%M:%S")
                );

                let intent =
                    self.engine
                        .evaluate_error_policy(record.device_id, record.flags, Utc::now())?;

                if let Some(intent) = intent {
                    self.execute(intent).await?;
                }

                Ok(DispatchOutcome::ErrorEvaluated {
                    device_id: record.device_id,
                    intent,
                })
            }

            ClassifiedEvent::ProductionKpi(kpi) => {
                tracing::info!(
                    "设备 {} KPI: {:.1}% 效率",
                    kpi.device_id,
                    kpi.good_production_percentage
                );

                let intent = self.engine.evaluate_throttle_policy(&kpi);

                if let Some(intent) = intent {
                    self.execute(intent).await?;
                }

                Ok(DispatchOutcome::KpiEvaluated {
                    device_id: kpi.device_id,
                    intent,
                })
            }

            ClassifiedEvent::Unrecognized { discriminator } => {
                let reason = format!(
                    "未知消息类型: {}",
                    discriminator.as_deref().unwrap_or("(无判别字段)")
                );
                tracing::warn!("{}", reason);
                Ok(DispatchOutcome::Dropped { reason })
            }

            ClassifiedEvent::ParseFailure { kind, reason } => {
                let reason = format!("消息解析失败 (kind={}): {}", kind, reason);
                tracing::warn!("{}", reason);
                Ok(DispatchOutcome::Dropped { reason })
            }
        }
    }

    /// 并发处理一批入站消息
    ///
    /// 单条失败不影响其余消息；失败以各自的 Result 返回
    pub async fn handle_batch(
        &self,
        envelopes: &[MessageEnvelope],
    ) -> Vec<Result<DispatchOutcome, DispatchError>> {
        futures::future::join_all(
            envelopes
                .iter()
                .map(|envelope| self.handle_envelope(envelope)),
        )
        .await
    }

    /// 摄入按行分隔的 KPI 聚合数据
    ///
    /// 每行一条 JSON；无法解析的行记诊断后跳过，绝不中断整批
    ///
    /// # 返回
    /// 成功评估的样本数量
    pub async fn ingest_kpi_batch(&self, data: &str) -> usize {
        let mut processed = 0;

        for line in data.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let kpi = match serde_json::from_str::<ProductionKpiMessage>(line) {
                Ok(kpi) => kpi,
                Err(e) => {
                    tracing::warn!("KPI 行无法解析，已跳过: {} ({})", line, e);
                    continue;
                }
            };
            if let Err(reason) = kpi.validate() {
                tracing::warn!("KPI 行校验失败，已跳过: {}", reason);
                continue;
            }

            tracing::info!(
                "设备 {} KPI: {:.1}% 效率",
                kpi.device_id,
                kpi.good_production_percentage
            );

            if let Some(intent) = self.engine.evaluate_throttle_policy(&kpi) {
                if let Err(e) = self.execute(intent).await {
                    // 下发失败记严重告警，继续处理后续样本
                    tracing::error!("KPI 降速指令下发失败: {}", e);
                }
            }
            processed += 1;
        }

        processed
    }

    /// 摄入按行分隔的批量聚合错误数据
    ///
    /// 每行一条 JSON（位码编码）；坏行跳过，绝不中断整批
    ///
    /// # 返回
    /// 成功评估的错误记录数量
    pub async fn ingest_error_batch(&self, data: &str) -> usize {
        let mut processed = 0;

        for line in data.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let record = match crate::domain::message::DeviceErrorRecord::decode(line) {
                Ok(record) => record,
                Err(reason) => {
                    tracing::warn!("错误行无法解析，已跳过: {} ({})", line, reason);
                    continue;
                }
            };

            tracing::warn!(
                "设备错误告警: 设备 {} 错误状态: {}",
                record.device_id,
                record.flags.describe()
            );

            match self
                .engine
                .evaluate_error_policy(record.device_id, record.flags, Utc::now())
            {
                Ok(Some(intent)) => {
                    if let Err(e) = self.execute(intent).await {
                        tracing::error!("紧急停机指令下发失败: {}", e);
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::error!("错误策略评估失败: {}", e);
                    continue;
                }
            }
            processed += 1;
        }

        processed
    }

    /// 执行一个决策意图
    ///
    /// 下发失败原样上抛；窗口状态此刻已更新完毕，不会回滚
    async fn execute(&self, intent: ActuationIntent) -> Result<(), DispatchError> {
        tracing::info!("执行决策意图: {}", intent);

        match intent {
            ActuationIntent::EmergencyStop(device_id) => {
                self.gateway.emergency_stop(device_id).await?
            }
            ActuationIntent::DecreaseRate(device_id) => {
                self.gateway.decrease_rate(device_id).await?
            }
            ActuationIntent::ResetError(device_id) => {
                self.gateway.reset_error_status(device_id).await?
            }
        }

        Ok(())
    }
}
