// ==========================================
// 产线设备控制系统 - 执行通道层
// ==========================================
// 职责: 定义设备执行指令下发接口，核心只调用不实现
// 说明: 任一实现的契约——每次调用要么成功（设备已确认），
//       要么返回错误；错误必须上抛给调用方记录告警，
//       但绝不阻塞其他设备、其他事件的后续处理
// ==========================================

pub mod error;
pub mod simulated;

pub use error::GatewayError;
pub use simulated::{ActuationRecord, SimulatedDeviceGateway, SimulatedDeviceState};

use crate::domain::types::DeviceId;
use async_trait::async_trait;

// ==========================================
// 执行通道 Trait
// ==========================================

/// 设备执行通道
///
/// 核心层定义，外部基础设施实现；
/// 超时与重试属于实现方职责，决策引擎不感知
#[async_trait]
pub trait ActuationGateway: Send + Sync {
    /// 触发紧急停机
    ///
    /// 实现方需保证"对已停机设备再次下发停机"的幂等性
    async fn emergency_stop(&self, device_id: DeviceId) -> Result<(), GatewayError>;

    /// 下调生产速率
    ///
    /// 降速幅度（固定步长、下限 0）由实现方/设备侧决定
    async fn decrease_rate(&self, device_id: DeviceId) -> Result<(), GatewayError>;

    /// 复位设备错误状态
    async fn reset_error_status(&self, device_id: DeviceId) -> Result<(), GatewayError>;
}

// ==========================================
// 空操作执行通道
// ==========================================

/// 空操作执行通道
///
/// 用于不需要真实下发指令的场景（如单元测试、干跑模式）
#[derive(Debug, Clone, Default)]
pub struct NoOpActuationGateway;

#[async_trait]
impl ActuationGateway for NoOpActuationGateway {
    async fn emergency_stop(&self, device_id: DeviceId) -> Result<(), GatewayError> {
        tracing::debug!("NoOpActuationGateway: 跳过紧急停机下发 - device_id={}", device_id);
        Ok(())
    }

    async fn decrease_rate(&self, device_id: DeviceId) -> Result<(), GatewayError> {
        tracing::debug!("NoOpActuationGateway: 跳过降速下发 - device_id={}", device_id);
        Ok(())
    }

    async fn reset_error_status(&self, device_id: DeviceId) -> Result<(), GatewayError> {
        tracing::debug!("NoOpActuationGateway: 跳过错误复位下发 - device_id={}", device_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_gateway_always_succeeds() {
        let gateway = NoOpActuationGateway;

        assert!(gateway.emergency_stop(7).await.is_ok());
        assert!(gateway.decrease_rate(7).await.is_ok());
        assert!(gateway.reset_error_status(7).await.is_ok());
    }
}
