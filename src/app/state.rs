// ==========================================
// 产线设备控制系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态与组件装配
// 说明: 设备窗口表由跟踪器独占持有，引擎只经 record 读计数，
//       清理任务只做剔除；其余组件不得直接触碰窗口
// ==========================================

use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::app::dispatcher::EventDispatcher;
use crate::config::ControlConfig;
use crate::engine::decision::{DecisionEngine, PolicyThresholds};
use crate::engine::error_window::ErrorWindowTracker;
use crate::engine::janitor::WindowJanitor;
use crate::gateway::ActuationGateway;
use chrono::Duration as ChronoDuration;
use std::time::Duration;

/// 应用状态
///
/// 包含控制环全部组件实例与共享资源
pub struct AppState {
    /// 控制环配置
    pub config: ControlConfig,

    /// 错误窗口跟踪器（唯一可变共享状态的持有者）
    pub tracker: Arc<ErrorWindowTracker>,

    /// 控制决策引擎
    pub engine: Arc<DecisionEngine>,

    /// 执行通道
    pub gateway: Arc<dyn ActuationGateway>,

    /// 事件分发服务
    pub dispatcher: Arc<EventDispatcher>,
}

impl AppState {
    /// 创建新的 AppState 实例
    ///
    /// # 参数
    /// - `config`: 已校验的控制环配置
    /// - `gateway`: 执行通道实现
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 按配置水平线创建错误窗口跟踪器
    /// 2. 按配置阈值创建决策引擎
    /// 3. 装配事件分发服务
    pub fn new(config: ControlConfig, gateway: Arc<dyn ActuationGateway>) -> Self {
        tracing::info!(
            "初始化 AppState: 错误阈值 {}, 策略窗口 {}s, 清理窗口 {}s",
            config.error_threshold,
            config.policy_window_secs,
            config.sweep_window_secs
        );

        let tracker = Arc::new(ErrorWindowTracker::with_windows(
            ChronoDuration::seconds(config.policy_window_secs),
            ChronoDuration::seconds(config.sweep_window_secs),
        ));

        let engine = Arc::new(DecisionEngine::with_policy(
            tracker.clone(),
            PolicyThresholds {
                error_threshold: config.error_threshold,
                efficiency_floor_pct: config.efficiency_floor_pct,
            },
        ));

        let dispatcher = Arc::new(EventDispatcher::new(engine.clone(), gateway.clone()));

        Self {
            config,
            tracker,
            engine,
            gateway,
            dispatcher,
        }
    }

    /// 启动后台窗口清理任务
    ///
    /// 清理周期来自配置；返回任务句柄，进程关停时 abort
    pub fn spawn_janitor(&self) -> JoinHandle<()> {
        let janitor = WindowJanitor::with_period(
            self.tracker.clone(),
            Duration::from_secs(self.config.janitor_period_secs),
        );
        janitor.spawn()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::NoOpActuationGateway;

    #[test]
    fn test_app_state_wiring() {
        let state = AppState::new(ControlConfig::default(), Arc::new(NoOpActuationGateway));

        assert_eq!(state.config.error_threshold, 3);
        assert_eq!(state.tracker.device_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_spawn_janitor_returns_live_handle() {
        let state = AppState::new(ControlConfig::default(), Arc::new(NoOpActuationGateway));

        let handle = state.spawn_janitor();
        assert!(!handle.is_finished());
        handle.abort();
    }
}
