// ==========================================
// 产线设备控制系统 - 核心库
// ==========================================
// 技术栈: Tokio + Rust
// 系统定位: 实时决策引擎 (事件驱动控制环)
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 引擎层 - 业务规则
pub mod engine;

// 执行通道层 - 设备指令下发
pub mod gateway;

// 配置层 - 系统配置
pub mod config;

// 日志系统
pub mod logging;

// 应用层 - 组件装配与事件分发
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{ActuationIntent, DeviceId, ErrorFlags};

// 领域消息
pub use domain::message::{
    DeviceErrorRecord, MessageEnvelope, ProductionKpiMessage, TelemetryMessage,
};

// 引擎
pub use engine::{
    ClassifiedEvent, DecisionEngine, EngineError, ErrorWindowTracker, EventClassifier,
    SweepStats, WindowJanitor,
};

// 执行通道
pub use gateway::{ActuationGateway, GatewayError, NoOpActuationGateway, SimulatedDeviceGateway};

// 应用层
pub use app::{AppState, DispatchError, DispatchOutcome, EventDispatcher};

// 配置
pub use config::{ConfigManager, ControlConfig};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "产线设备控制系统";
