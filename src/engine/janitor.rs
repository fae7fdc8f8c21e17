// ==========================================
// 产线设备控制系统 - 窗口清理任务
// ==========================================
// 职责: 定时触发错误窗口跟踪器的周期清理，约束内存占用
// 说明: 独立定时任务，与事件处理不共享线程假设；
//       对共享窗口表的操作遵循与热路径相同的锁纪律；
//       清理水平线 ≥ 策略水平线，正常运行下不改变策略结果
// ==========================================

use crate::engine::error::EngineResult;
use crate::engine::error_window::{ErrorWindowTracker, SweepStats};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

// 默认清理周期: 5 分钟
const DEFAULT_PERIOD_SECS: u64 = 300;

// ==========================================
// WindowJanitor - 窗口清理任务
// ==========================================
pub struct WindowJanitor {
    tracker: Arc<ErrorWindowTracker>,
    period: Duration,
}

impl WindowJanitor {
    /// 使用默认周期 (5 分钟) 创建清理任务
    pub fn new(tracker: Arc<ErrorWindowTracker>) -> Self {
        Self::with_period(tracker, Duration::from_secs(DEFAULT_PERIOD_SECS))
    }

    /// 使用自定义周期创建清理任务
    pub fn with_period(tracker: Arc<ErrorWindowTracker>, period: Duration) -> Self {
        Self { tracker, period }
    }

    /// 执行一轮清理
    ///
    /// # 返回
    /// - Ok(SweepStats): 本轮清理统计
    pub fn run_once(&self) -> EngineResult<SweepStats> {
        tracing::info!("开始周期性窗口清理");

        let stats = self.tracker.sweep(Utc::now())?;

        tracing::info!(
            "周期清理完成: 剔除 {} 条过期记录, 移除 {} 台空窗口设备, 仍在跟踪 {} 台设备",
            stats.pruned_occurrences,
            stats.removed_devices,
            stats.remaining_devices
        );

        Ok(stats)
    }

    /// 启动后台清理循环
    ///
    /// 按固定周期运行，直到任务被中止（进程关停时 abort）
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.period);
            // 消耗立即到期的首个 tick，从一个完整周期后开始清理
            interval.tick().await;

            loop {
                interval.tick().await;

                if let Err(e) = self.run_once() {
                    tracing::error!("周期清理失败: {}", e);
                }
            }
        })
    }
}
