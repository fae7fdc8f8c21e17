// ==========================================
// 产线设备控制系统 - 引擎层
// ==========================================
// 职责: 实现事件分类、错误窗口跟踪与控制决策规则
// 红线: 所有决策由当前窗口状态重新推导，不保留"已停机"状态
// ==========================================

pub mod classifier;
pub mod decision;
pub mod error;
pub mod error_window;
pub mod janitor;

// 重导出核心引擎
pub use classifier::{ClassifiedEvent, EventClassifier};
pub use decision::{DecisionEngine, PolicyThresholds};
pub use error::EngineError;
pub use error_window::{ErrorWindowTracker, SweepStats};
pub use janitor::WindowJanitor;
