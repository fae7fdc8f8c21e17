// ==========================================
// 产线设备控制系统 - 服务主入口
// ==========================================
// 技术栈: Tokio + Rust
// 系统定位: 实时决策引擎 (事件驱动控制环)
// ==========================================
// 说明: 传输层在本进程外；此入口从标准输入按行读取
//       消息载荷（每行一条 JSON），适配任意日志型投递通道。
//       关停时停止接收新事件，在途评估允许完成——
//       中断一半的紧急停机决策是安全隐患
// ==========================================

use anyhow::Context;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use prodline_control::app::AppState;
use prodline_control::config::ConfigManager;
use prodline_control::domain::message::MessageEnvelope;
use prodline_control::gateway::SimulatedDeviceGateway;
use prodline_control::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志系统
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{} - 实时决策引擎", prodline_control::APP_NAME);
    tracing::info!("系统版本: {}", prodline_control::VERSION);
    tracing::info!("==================================================");

    // 加载配置（默认路径缺失时回退内置默认值）
    let config_path = ConfigManager::default_config_path();
    let config = ConfigManager::load(config_path.as_deref()).context("配置加载失败")?;

    // 装配执行通道与应用状态
    let gateway = Arc::new(SimulatedDeviceGateway::with_settings(
        config.device_name_template.clone(),
        config.rate_step_pct,
    ));
    let state = AppState::new(config, gateway);

    // 启动后台窗口清理任务
    let janitor_handle = state.spawn_janitor();
    tracing::info!("窗口清理任务已启动, 周期 {}s", state.config.janitor_period_secs);

    // 主消费循环: 标准输入逐行读取消息载荷
    tracing::info!("开始消费入站事件 (stdin, 每行一条 JSON; Ctrl-C 关停)");
    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        let line = line.trim().to_string();
                        if line.is_empty() {
                            continue;
                        }

                        tracing::info!("收到消息: {}", line);
                        let envelope = MessageEnvelope::from_payload(line);

                        // 单事件失败不中断事件流
                        if let Err(e) = state.dispatcher.handle_envelope(&envelope).await {
                            tracing::error!("事件处理失败 (严重告警): {}", e);
                        }
                    }
                    Ok(None) => {
                        tracing::info!("输入流结束");
                        break;
                    }
                    Err(e) => {
                        tracing::error!("读取输入失败: {}", e);
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("收到关停信号，停止接收新事件");
                break;
            }
        }
    }

    // 关停: 在途评估已随 handle_envelope 完成，仅需停掉清理任务
    janitor_handle.abort();
    tracing::info!("服务已退出");

    Ok(())
}
