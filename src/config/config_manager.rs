// ==========================================
// 产线设备控制系统 - 配置管理器
// ==========================================
// 职责: 配置加载、默认值、一致性校验
// 存储: JSON 配置文件 (可选；缺省时使用内置默认值)
// ==========================================
// 说明: 所有策略阈值的默认值即兼容基线——
//       3 次错误 / 60s 策略窗口 / 120s 清理窗口 /
//       90% 效率下限 / 10 点降速步长；配置仅做覆盖
// ==========================================

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// 配置层错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件读取失败: {0}")]
    Io(#[from] std::io::Error),

    #[error("配置文件解析失败: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("配置校验失败: {0}")]
    Invalid(String),
}

// ==========================================
// ControlConfig - 控制环配置
// ==========================================

/// 控制环配置
///
/// 字段缺省时逐项回退到默认值
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// 紧急停机错误次数阈值（严格大于才触发）
    pub error_threshold: usize,
    /// 策略水平线（秒）
    pub policy_window_secs: i64,
    /// 清理水平线（秒）
    pub sweep_window_secs: i64,
    /// 周期清理间隔（秒）
    pub janitor_period_secs: u64,
    /// 生产效率下限（百分比）
    pub efficiency_floor_pct: f64,
    /// 降速步长（百分点）
    pub rate_step_pct: i32,
    /// 设备命名模板（{id} 占位符）
    pub device_name_template: String,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            error_threshold: 3,
            policy_window_secs: 60,
            sweep_window_secs: 120,
            janitor_period_secs: 300,
            efficiency_floor_pct: 90.0,
            rate_step_pct: 10,
            device_name_template: "Agent{id}".to_string(),
        }
    }
}

impl ControlConfig {
    /// 一致性校验
    ///
    /// 清理水平线必须不短于策略水平线，
    /// 否则周期清理会剔除策略仍需要的数据
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.policy_window_secs <= 0 {
            return Err(ConfigError::Invalid(format!(
                "策略水平线必须为正: {}",
                self.policy_window_secs
            )));
        }
        if self.sweep_window_secs < self.policy_window_secs {
            return Err(ConfigError::Invalid(format!(
                "清理水平线 ({}s) 不得短于策略水平线 ({}s)",
                self.sweep_window_secs, self.policy_window_secs
            )));
        }
        if self.janitor_period_secs == 0 {
            return Err(ConfigError::Invalid("清理周期必须为正".to_string()));
        }
        if !(0.0..=100.0).contains(&self.efficiency_floor_pct) {
            return Err(ConfigError::Invalid(format!(
                "效率下限越界: {}",
                self.efficiency_floor_pct
            )));
        }
        if self.rate_step_pct <= 0 {
            return Err(ConfigError::Invalid(format!(
                "降速步长必须为正: {}",
                self.rate_step_pct
            )));
        }
        Ok(())
    }
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager;

impl ConfigManager {
    /// 加载配置
    ///
    /// # 参数
    /// - `path`: 配置文件路径；None 或文件不存在时使用默认值
    ///
    /// # 返回
    /// - Ok(ControlConfig): 校验通过的配置
    /// - Err(ConfigError): 文件存在但读取/解析/校验失败
    pub fn load(path: Option<&Path>) -> Result<ControlConfig, ConfigError> {
        let config = match path {
            Some(path) if path.exists() => {
                tracing::info!("加载配置文件: {}", path.display());
                let content = std::fs::read_to_string(path)?;
                serde_json::from_str::<ControlConfig>(&content)?
            }
            Some(path) => {
                tracing::info!("配置文件不存在，使用默认配置: {}", path.display());
                ControlConfig::default()
            }
            None => {
                tracing::info!("未指定配置文件，使用默认配置");
                ControlConfig::default()
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// 默认配置文件路径
    ///
    /// 位于系统配置目录下的 prodline-control/config.json
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("prodline-control").join("config.json"))
    }
}
