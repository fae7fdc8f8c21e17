// ==========================================
// 产线设备控制系统 - 仿真设备执行通道
// ==========================================
// 职责: 以内存设备注册表实现执行通道，供本机运行与测试使用
// 说明: 设备侧语义——降速固定步长、速率下限 0、停机幂等；
//       每次成功下发记入调用审计日志（指令ID + 时刻），
//       用于核对"观测到什么"与"实际执行了什么"
// ==========================================

use crate::domain::types::{DeviceId, ErrorFlags};
use crate::gateway::error::GatewayError;
use crate::gateway::ActuationGateway;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

// 默认生产速率 (%)
const DEFAULT_PRODUCTION_RATE: i32 = 100;

// 默认降速步长 (百分点)
const DEFAULT_RATE_STEP: i32 = 10;

// 默认设备命名模板，{id} 为占位符
const DEFAULT_DEVICE_NAME_TEMPLATE: &str = "Agent{id}";

// ==========================================
// 仿真设备状态
// ==========================================

/// 仿真设备状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedDeviceState {
    /// 当前生产速率 (%)
    pub production_rate: i32,
    /// 当前错误标志位
    pub errors: ErrorFlags,
    /// 是否处于紧急停机
    pub stopped: bool,
}

impl Default for SimulatedDeviceState {
    fn default() -> Self {
        Self {
            production_rate: DEFAULT_PRODUCTION_RATE,
            errors: ErrorFlags::NONE,
            stopped: false,
        }
    }
}

/// 指令下发审计记录
#[derive(Debug, Clone)]
pub struct ActuationRecord {
    /// 指令 ID
    pub command_id: Uuid,
    /// 目标设备
    pub device_id: DeviceId,
    /// 指令类型标识
    pub command: &'static str,
    /// 下发时刻
    pub issued_at: DateTime<Utc>,
}

// ==========================================
// SimulatedDeviceGateway - 仿真执行通道
// ==========================================
pub struct SimulatedDeviceGateway {
    devices: Mutex<HashMap<DeviceId, SimulatedDeviceState>>,
    invocations: Mutex<Vec<ActuationRecord>>,
    device_name_template: String,
    rate_step: i32,
}

impl SimulatedDeviceGateway {
    /// 使用默认命名模板与降速步长创建
    pub fn new() -> Self {
        Self::with_settings(DEFAULT_DEVICE_NAME_TEMPLATE.to_string(), DEFAULT_RATE_STEP)
    }

    /// 使用自定义命名模板与降速步长创建
    ///
    /// # 参数
    /// - `device_name_template`: 设备命名模板（{id} 占位符）
    /// - `rate_step`: 每次降速的百分点步长
    pub fn with_settings(device_name_template: String, rate_step: i32) -> Self {
        tracing::info!(
            "仿真执行通道就绪, 设备命名模板: {}",
            device_name_template
        );
        Self {
            devices: Mutex::new(HashMap::new()),
            invocations: Mutex::new(Vec::new()),
            device_name_template,
            rate_step,
        }
    }

    /// 注册一台仿真设备（初始速率为默认 100%）
    pub fn register_device(&self, device_id: DeviceId) -> Result<(), GatewayError> {
        let mut devices = self
            .devices
            .lock()
            .map_err(|e| GatewayError::ChannelError(e.to_string()))?;
        devices.entry(device_id).or_default();
        Ok(())
    }

    /// 读取设备当前状态
    pub fn device_state(&self, device_id: DeviceId) -> Option<SimulatedDeviceState> {
        self.devices
            .lock()
            .ok()
            .and_then(|devices| devices.get(&device_id).cloned())
    }

    /// 指令下发审计日志副本
    pub fn invocations(&self) -> Vec<ActuationRecord> {
        self.invocations
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    /// 按命名模板生成设备名
    ///
    /// 模板无 {id} 占位符时回退为模板+ID 拼接
    pub fn device_name(&self, device_id: DeviceId) -> String {
        if self.device_name_template.contains("{id}") {
            self.device_name_template
                .replace("{id}", &device_id.to_string())
        } else {
            format!("{}{}", self.device_name_template, device_id)
        }
    }

    fn audit(&self, device_id: DeviceId, command: &'static str) {
        if let Ok(mut records) = self.invocations.lock() {
            records.push(ActuationRecord {
                command_id: Uuid::new_v4(),
                device_id,
                command,
                issued_at: Utc::now(),
            });
        }
    }
}

impl Default for SimulatedDeviceGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ActuationGateway for SimulatedDeviceGateway {
    async fn emergency_stop(&self, device_id: DeviceId) -> Result<(), GatewayError> {
        let device_name = self.device_name(device_id);
        tracing::info!("下发紧急停机指令: {}", device_name);

        let mut devices = self
            .devices
            .lock()
            .map_err(|e| GatewayError::ChannelError(e.to_string()))?;

        // 直接方法调用要求设备已注册
        let state = devices
            .get_mut(&device_id)
            .ok_or(GatewayError::DeviceNotFound { device_name })?;

        // 幂等: 对已停机设备重复下发仍视为成功
        state.stopped = true;
        state.production_rate = 0;
        drop(devices);

        self.audit(device_id, "EmergencyStop");
        tracing::info!("紧急停机执行成功: {}", self.device_name(device_id));
        Ok(())
    }

    async fn decrease_rate(&self, device_id: DeviceId) -> Result<(), GatewayError> {
        let device_name = self.device_name(device_id);
        tracing::info!("下发降速指令: {}", device_name);

        let mut devices = self
            .devices
            .lock()
            .map_err(|e| GatewayError::ChannelError(e.to_string()))?;

        // 期望属性写入: 未注册设备按默认速率补建（与孪生默认值一致）
        let state = devices.entry(device_id).or_default();
        let current = state.production_rate;
        let new_rate = (current - self.rate_step).max(0);
        state.production_rate = new_rate;
        drop(devices);

        self.audit(device_id, "DecreaseRate");
        tracing::info!(
            "生产速率已下调: {} {}% → {}%",
            self.device_name(device_id),
            current,
            new_rate
        );
        Ok(())
    }

    async fn reset_error_status(&self, device_id: DeviceId) -> Result<(), GatewayError> {
        let device_name = self.device_name(device_id);
        tracing::info!("下发错误复位指令: {}", device_name);

        let mut devices = self
            .devices
            .lock()
            .map_err(|e| GatewayError::ChannelError(e.to_string()))?;

        let state = devices
            .get_mut(&device_id)
            .ok_or(GatewayError::DeviceNotFound { device_name })?;

        state.errors = ErrorFlags::NONE;
        drop(devices);

        self.audit(device_id, "ResetErrorStatus");
        tracing::info!("错误状态复位成功: {}", self.device_name(device_id));
        Ok(())
    }
}
