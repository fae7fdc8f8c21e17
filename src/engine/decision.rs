// ==========================================
// 产线设备控制系统 - 控制决策引擎
// ==========================================
// 依据: 业务规则1 (一分钟内超过3次可计数错误 → 紧急停机)
// 依据: 业务规则2 (效率低于90% → 下调生产速率)
// ==========================================
// 职责: 将错误事件与效率样本映射为执行意图
// 说明: 紧急停机判定为电平触发——每次事件都从当前窗口
//       重新推导，引擎不保留"已触发停机"状态；
//       重复停机指令的幂等性由设备侧执行通道保证
// ==========================================

use crate::domain::message::ProductionKpiMessage;
use crate::domain::types::{ActuationIntent, DeviceId, ErrorFlags};
use crate::engine::error::EngineResult;
use crate::engine::error_window::ErrorWindowTracker;
use chrono::{DateTime, Utc};
use std::sync::Arc;

// ==========================================
// 策略阈值
// ==========================================

/// 决策策略阈值
///
/// 默认值即兼容基线，配置可覆盖
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolicyThresholds {
    /// 紧急停机错误次数阈值（严格大于才触发）
    pub error_threshold: usize,
    /// 生产效率下限（百分比，低于才降速）
    pub efficiency_floor_pct: f64,
}

impl Default for PolicyThresholds {
    fn default() -> Self {
        Self {
            error_threshold: 3,
            efficiency_floor_pct: 90.0,
        }
    }
}

// ==========================================
// DecisionEngine - 控制决策引擎
// ==========================================
pub struct DecisionEngine {
    tracker: Arc<ErrorWindowTracker>,
    policy: PolicyThresholds,
}

impl DecisionEngine {
    /// 使用默认策略阈值创建引擎
    pub fn new(tracker: Arc<ErrorWindowTracker>) -> Self {
        Self::with_policy(tracker, PolicyThresholds::default())
    }

    /// 使用自定义策略阈值创建引擎
    pub fn with_policy(tracker: Arc<ErrorWindowTracker>, policy: PolicyThresholds) -> Self {
        Self { tracker, policy }
    }

    /// 评估紧急停机策略
    ///
    /// 1. 计算可计数子集 (清除 EMERGENCY_STOP)
    /// 2. 子集为空: 不计数、不触发 (仅停机标志的事件不会引发新停机)
    /// 3. 子集非空: 记录并取得窗口内计数
    /// 4. 计数严格大于阈值: 返回紧急停机意图
    ///
    /// # 参数
    /// - `device_id`: 设备标识
    /// - `flags`: 本次事件携带的错误标志位
    /// - `now`: 处理时刻
    ///
    /// # 返回
    /// - Ok(Some(ActuationIntent::EmergencyStop)): 需要紧急停机
    /// - Ok(None): 无需动作
    pub fn evaluate_error_policy(
        &self,
        device_id: DeviceId,
        flags: ErrorFlags,
        now: DateTime<Utc>,
    ) -> EngineResult<Option<ActuationIntent>> {
        let countable = flags.countable();

        if countable.is_empty() {
            tracing::info!(
                "设备 {} 仅携带紧急停机标志，不参与错误计数",
                device_id
            );
            return Ok(None);
        }

        let count = self.tracker.record(device_id, flags, now)?;

        tracing::info!(
            "设备 {} 最近一分钟可计数错误次数: {} (本次标志: {}, 可计数: {})",
            device_id,
            count,
            flags,
            countable
        );

        if count > self.policy.error_threshold {
            tracing::error!(
                "触发紧急停机: 设备 {} 一分钟内出现 {} 次可计数错误!",
                device_id,
                count
            );
            return Ok(Some(ActuationIntent::EmergencyStop(device_id)));
        }

        tracing::info!(
            "设备 {} 错误次数 ({}) 在可接受范围内 (≤{})",
            device_id,
            count,
            self.policy.error_threshold
        );
        Ok(None)
    }

    /// 评估生产降速策略
    ///
    /// 效率低于下限则产生降速意图；降速步长由设备侧决定，
    /// 引擎只给方向不给幅度（引擎不跟踪设备当前速率）
    ///
    /// # 参数
    /// - `sample`: 单个效率 KPI 样本
    pub fn evaluate_throttle_policy(&self, sample: &ProductionKpiMessage) -> Option<ActuationIntent> {
        if sample.good_production_percentage < self.policy.efficiency_floor_pct {
            tracing::warn!(
                "设备 {} 效率 {:.1}% 低于下限 {:.1}%，下调生产速率",
                sample.device_id,
                sample.good_production_percentage,
                self.policy.efficiency_floor_pct
            );
            return Some(ActuationIntent::DecreaseRate(sample.device_id));
        }

        tracing::info!(
            "设备 {} 效率可接受: {:.1}%",
            sample.device_id,
            sample.good_production_percentage
        );
        None
    }
}
