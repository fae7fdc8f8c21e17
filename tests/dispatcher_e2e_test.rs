// ==========================================
// 事件分发端到端测试
// ==========================================
// 测试目标: 验证信封 → 分类 → 决策 → 执行通道的完整链路
// 覆盖范围: 紧急停机执行 / 降速执行 / 下发失败不阻断事件流
// ==========================================


use prodline_control::app::{AppState, DispatchOutcome};
use prodline_control::config::ControlConfig;
use prodline_control::domain::message::MessageEnvelope;
use prodline_control::domain::types::ActuationIntent;
use prodline_control::gateway::SimulatedDeviceGateway;
use std::sync::Arc;

use test_helpers::{
    at, error_aggregate_payload, error_envelope, kpi_envelope, telemetry_payload,
};

// ==========================================
// 测试辅助函数
// ==========================================

/// 创建带仿真执行通道的测试环境
fn setup() -> (AppState, Arc<SimulatedDeviceGateway>) {
    let gateway = Arc::new(SimulatedDeviceGateway::new());
    let state = AppState::new(ControlConfig::default(), gateway.clone());
    (state, gateway)
}

// ==========================================
// 紧急停机链路
// ==========================================

#[tokio::test]
async fn test_fourth_error_within_window_stops_device() {
    let (state, gateway) = setup();
    gateway.register_device(7).unwrap();

    // 连续 4 次电源故障 (errorCode=2)；分发层以处理时刻计窗口，
    // 测试内顺序执行，间隔远小于 60s
    let mut last_outcome = None;
    for i in 0..4 {
        let envelope = error_envelope(7, 2, at(i));
        last_outcome = Some(state.dispatcher.handle_envelope(&envelope).await.unwrap());
    }

    // 第 4 次评估产生停机意图并已执行
    match last_outcome.unwrap() {
        DispatchOutcome::ErrorEvaluated { device_id, intent } => {
            assert_eq!(device_id, 7);
            assert_eq!(intent, Some(ActuationIntent::EmergencyStop(7)));
        }
        other => panic!("期望 ErrorEvaluated，实际 {:?}", other),
    }

    let device = gateway.device_state(7).unwrap();
    assert!(device.stopped);
    assert_eq!(device.production_rate, 0);

    // 审计日志: 恰好一次停机下发
    let stops = gateway
        .invocations()
        .iter()
        .filter(|r| r.command == "EmergencyStop")
        .count();
    assert_eq!(stops, 1);
}

#[tokio::test]
async fn test_three_errors_do_not_stop_device() {
    let (state, gateway) = setup();
    gateway.register_device(7).unwrap();

    for i in 0..3 {
        let envelope = error_envelope(7, 2, at(i));
        state.dispatcher.handle_envelope(&envelope).await.unwrap();
    }

    assert!(!gateway.device_state(7).unwrap().stopped);
    assert!(gateway.invocations().is_empty());
}

#[tokio::test]
async fn test_emergency_stop_only_events_never_stop_device() {
    let (state, gateway) = setup();
    gateway.register_device(7).unwrap();

    // errorCode=1: 仅紧急停机标志，来多少次都不触发
    for i in 0..10 {
        let envelope = error_envelope(7, 1, at(i));
        let outcome = state.dispatcher.handle_envelope(&envelope).await.unwrap();
        match outcome {
            DispatchOutcome::ErrorEvaluated { intent, .. } => assert!(intent.is_none()),
            other => panic!("期望 ErrorEvaluated，实际 {:?}", other),
        }
    }

    assert!(!gateway.device_state(7).unwrap().stopped);
}

// ==========================================
// 降速链路
// ==========================================

#[tokio::test]
async fn test_low_efficiency_kpi_decreases_rate() {
    let (state, gateway) = setup();
    gateway.register_device(7).unwrap();

    let outcome = state
        .dispatcher
        .handle_envelope(&kpi_envelope(7, 85.0))
        .await
        .unwrap();

    match outcome {
        DispatchOutcome::KpiEvaluated { device_id, intent } => {
            assert_eq!(device_id, 7);
            assert_eq!(intent, Some(ActuationIntent::DecreaseRate(7)));
        }
        other => panic!("期望 KpiEvaluated，实际 {:?}", other),
    }

    // 降速步长 10 点: 100% → 90%
    assert_eq!(gateway.device_state(7).unwrap().production_rate, 90);
}

#[tokio::test]
async fn test_acceptable_efficiency_kpi_keeps_rate() {
    let (state, gateway) = setup();
    gateway.register_device(7).unwrap();

    state
        .dispatcher
        .handle_envelope(&kpi_envelope(7, 95.0))
        .await
        .unwrap();

    assert_eq!(gateway.device_state(7).unwrap().production_rate, 100);
    assert!(gateway.invocations().is_empty());
}

// ==========================================
// 故障隔离
// ==========================================

#[tokio::test]
async fn test_actuation_failure_surfaces_but_does_not_block_stream() {
    let (state, gateway) = setup();
    // 设备 42 未注册: 停机下发将失败

    for i in 0..3 {
        let envelope = error_envelope(42, 2, at(i));
        state.dispatcher.handle_envelope(&envelope).await.unwrap();
    }

    // 第 4 次: 决策成立但下发失败，错误上抛
    let envelope = error_envelope(42, 2, at(3));
    let result = state.dispatcher.handle_envelope(&envelope).await;
    assert!(result.is_err());

    // 失败不影响其他设备的后续事件
    gateway.register_device(8).unwrap();
    let outcome = state
        .dispatcher
        .handle_envelope(&kpi_envelope(8, 80.0))
        .await
        .unwrap();
    assert!(matches!(outcome, DispatchOutcome::KpiEvaluated { .. }));
    assert_eq!(gateway.device_state(8).unwrap().production_rate, 90);
}

#[tokio::test]
async fn test_error_occurrence_recorded_despite_actuation_failure() {
    let (state, gateway) = setup();
    // 未注册设备: 每次达到阈值后下发都失败

    for i in 0..4 {
        let envelope = error_envelope(42, 2, at(i));
        let _ = state.dispatcher.handle_envelope(&envelope).await;
    }

    // 观测审计不回滚: 第 4 次的记录仍然入了窗口
    // (分发层以处理时刻计窗口，这里同样用当前时刻查计数)
    let count = state
        .tracker
        .record(
            42,
            prodline_control::domain::types::ErrorFlags::POWER_FAILURE,
            chrono::Utc::now(),
        )
        .unwrap();
    assert_eq!(count, 5);

    // 注册后下一次错误事件重新推导决策并成功执行
    gateway.register_device(42).unwrap();
    let envelope = error_envelope(42, 2, at(6));
    let outcome = state.dispatcher.handle_envelope(&envelope).await.unwrap();
    match outcome {
        DispatchOutcome::ErrorEvaluated { intent, .. } => {
            assert_eq!(intent, Some(ActuationIntent::EmergencyStop(42)));
        }
        other => panic!("期望 ErrorEvaluated，实际 {:?}", other),
    }
    assert!(gateway.device_state(42).unwrap().stopped);
}

// ==========================================
// 混合事件流
// ==========================================

#[tokio::test]
async fn test_mixed_stream_processes_independently() {
    let (state, gateway) = setup();
    gateway.register_device(1).unwrap();
    gateway.register_device(2).unwrap();

    let envelopes = vec![
        MessageEnvelope::from_payload(telemetry_payload(1, "Running", 65.0)),
        kpi_envelope(1, 70.0),
        MessageEnvelope::from_payload(error_aggregate_payload(2, 4, at(0))),
        MessageEnvelope::from_payload(r#"{"mystery": true}"#.to_string()),
    ];

    let results = state.dispatcher.handle_batch(&envelopes).await;
    assert_eq!(results.len(), 4);

    assert!(matches!(
        results[0].as_ref().unwrap(),
        DispatchOutcome::TelemetryLogged { device_id: 1 }
    ));
    assert!(matches!(
        results[1].as_ref().unwrap(),
        DispatchOutcome::KpiEvaluated { .. }
    ));
    assert!(matches!(
        results[2].as_ref().unwrap(),
        DispatchOutcome::ErrorEvaluated { device_id: 2, .. }
    ));
    assert!(matches!(
        results[3].as_ref().unwrap(),
        DispatchOutcome::Dropped { .. }
    ));

    // 设备1 降速执行，设备2 单次错误不停机
    assert_eq!(gateway.device_state(1).unwrap().production_rate, 90);
    assert!(!gateway.device_state(2).unwrap().stopped);
}

// ==========================================
// 批量聚合摄入
// ==========================================

#[tokio::test]
async fn test_error_batch_feed_triggers_stop_at_threshold() {
    let (state, gateway) = setup();
    gateway.register_device(7).unwrap();

    // 4 行批量聚合错误 (errors=2): 第 4 行触发停机
    let lines: Vec<String> = (0..4)
        .map(|i| error_aggregate_payload(7, 2, at(i)))
        .collect();
    let data = lines.join("\n");

    let processed = state.dispatcher.ingest_error_batch(&data).await;
    assert_eq!(processed, 4);
    assert!(gateway.device_state(7).unwrap().stopped);
}

#[tokio::test]
async fn test_kpi_batch_feed_applies_throttle_per_line() {
    let (state, gateway) = setup();
    gateway.register_device(5).unwrap();

    let data = [
        test_helpers::kpi_payload(5, 85.0),
        test_helpers::kpi_payload(5, 95.0),
        test_helpers::kpi_payload(5, 70.0),
    ]
    .join("\n");

    let processed = state.dispatcher.ingest_kpi_batch(&data).await;
    assert_eq!(processed, 3);

    // 两次低效样本: 100% → 90% → 80%
    assert_eq!(gateway.device_state(5).unwrap().production_rate, 80);
}
