// ==========================================
// 产线设备控制系统 - 错误窗口跟踪器
// ==========================================
// 职责: 维护每台设备的滑动时间窗口错误时间戳队列
// 输入: 错误标志位 + 处理时刻
// 输出: 窗口内可计数错误次数
// ==========================================
// 说明: 策略水平线 (60s) 与清理水平线 (120s) 刻意不同——
//       前者定义安全规则本身，后者是内存回收的宽松兜底，
//       清理水平线 ≥ 策略水平线，保证清理不改变策略结果
// ==========================================

use crate::domain::types::{DeviceId, ErrorFlags};
use crate::engine::error::{EngineError, EngineResult};
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

// 默认策略水平线: 60 秒
const DEFAULT_POLICY_WINDOW_SECS: i64 = 60;

// 默认清理水平线: 120 秒
const DEFAULT_SWEEP_WINDOW_SECS: i64 = 120;

/// 周期清理统计
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepStats {
    /// 本轮剔除的过期时间戳数量
    pub pruned_occurrences: usize,
    /// 本轮移除的空窗口设备数量
    pub removed_devices: usize,
    /// 清理后仍在跟踪的设备数量
    pub remaining_devices: usize,
}

// ==========================================
// ErrorWindowTracker - 错误窗口跟踪器
// ==========================================
// 设备窗口表是核心中唯一的可变共享状态，
// 由本类型独占持有；按当前设备基数采用整表互斥锁，
// 同一设备的 record 之间以及 record 与 sweep 之间天然串行化
pub struct ErrorWindowTracker {
    /// 设备窗口表: 仅保留存在未过期错误的设备
    windows: Mutex<HashMap<DeviceId, VecDeque<DateTime<Utc>>>>,
    /// 策略水平线
    policy_window: Duration,
    /// 清理水平线
    sweep_window: Duration,
}

impl ErrorWindowTracker {
    /// 创建新的跟踪器（默认水平线: 策略 60s / 清理 120s）
    pub fn new() -> Self {
        Self::with_windows(
            Duration::seconds(DEFAULT_POLICY_WINDOW_SECS),
            Duration::seconds(DEFAULT_SWEEP_WINDOW_SECS),
        )
    }

    /// 使用自定义水平线创建跟踪器
    ///
    /// # 参数
    /// - `policy_window`: 策略水平线（紧急停机计数窗口）
    /// - `sweep_window`: 清理水平线（必须 ≥ 策略水平线）
    pub fn with_windows(policy_window: Duration, sweep_window: Duration) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            policy_window,
            sweep_window,
        }
    }

    /// 记录一次错误事件
    ///
    /// 可计数子集为空时不创建、不修改任何窗口，
    /// 仅返回该设备当前未剔除的计数（无窗口则为 0）；
    /// 否则追加 `now`，从队头剔除早于 `now - 策略水平线` 的条目，
    /// 返回剔除后的计数。同一设备的并发调用不会交错其剔除+追加步骤。
    ///
    /// # 参数
    /// - `device_id`: 设备标识（必须为正）
    /// - `flags`: 本次事件携带的错误标志位
    /// - `now`: 处理时刻（窗口定位采用处理时间而非事件自带时间戳）
    ///
    /// # 返回
    /// - Ok(usize): 窗口内可计数错误次数
    pub fn record(
        &self,
        device_id: DeviceId,
        flags: ErrorFlags,
        now: DateTime<Utc>,
    ) -> EngineResult<usize> {
        if device_id <= 0 {
            return Err(EngineError::InvalidDeviceId(device_id));
        }

        let mut windows = self
            .windows
            .lock()
            .map_err(|e| EngineError::LockPoisoned(e.to_string()))?;

        // 仅携带紧急停机标志的事件不计数、不建窗口
        if flags.countable().is_empty() {
            let current = windows.get(&device_id).map(|w| w.len()).unwrap_or(0);
            return Ok(current);
        }

        let window = windows.entry(device_id).or_default();
        window.push_back(now);

        // 剔除策略水平线之外的条目
        let cutoff = now - self.policy_window;
        while let Some(front) = window.front() {
            if *front < cutoff {
                window.pop_front();
            } else {
                break;
            }
        }

        Ok(window.len())
    }

    /// 周期清理所有设备窗口
    ///
    /// 以清理水平线（长于策略水平线）剔除过期条目，
    /// 移除窗口清空的设备；仅回收正常计数本就会剔除的状态，
    /// 用于约束停止上报错误的设备残留的内存
    ///
    /// # 参数
    /// - `now`: 清理时刻
    pub fn sweep(&self, now: DateTime<Utc>) -> EngineResult<SweepStats> {
        let mut windows = self
            .windows
            .lock()
            .map_err(|e| EngineError::LockPoisoned(e.to_string()))?;

        let cutoff = now - self.sweep_window;
        let mut pruned_occurrences = 0;
        let before = windows.len();

        for window in windows.values_mut() {
            while let Some(front) = window.front() {
                if *front < cutoff {
                    window.pop_front();
                    pruned_occurrences += 1;
                } else {
                    break;
                }
            }
        }

        // 移除空窗口设备，保证内存有界
        windows.retain(|_, window| !window.is_empty());
        let remaining_devices = windows.len();

        Ok(SweepStats {
            pruned_occurrences,
            removed_devices: before - remaining_devices,
            remaining_devices,
        })
    }

    /// 当前跟踪的设备数量（诊断用）
    pub fn device_count(&self) -> EngineResult<usize> {
        let windows = self
            .windows
            .lock()
            .map_err(|e| EngineError::LockPoisoned(e.to_string()))?;
        Ok(windows.len())
    }
}

impl Default for ErrorWindowTracker {
    fn default() -> Self {
        Self::new()
    }
}
