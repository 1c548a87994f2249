use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;
use vortex_telemetry::metrics::data::CpuIdentity;
use vortex_telemetry::metrics::traits::{
    CpuLoadProvider, FrequencyProvider, MemoryProvider, MemoryReading, NetworkCounterProvider,
    NetworkCounters, ProcessProvider,
};
use vortex_telemetry::{
    web::create_app, ActuationResult, AppState, ChannelStatus, Domain, EngineConfig, Lifecycle,
    ProcessRecord, Providers, Result, SystemSnapshot, TelemetryEngine, TelemetryError,
    TuningCapability, TuningLibrary, WebConfig,
};

struct FixedLoad(Vec<f64>);

impl CpuLoadProvider for FixedLoad {
    fn per_core_usage(&mut self) -> Result<Vec<f64>> {
        Ok(self.0.clone())
    }
}

struct FixedClocks;

impl FrequencyProvider for FixedClocks {
    fn per_core_frequency(&mut self) -> Result<Vec<f64>> {
        Ok(vec![3400.0, 3350.5])
    }
}

struct FixedMemory;

impl MemoryProvider for FixedMemory {
    fn memory(&mut self) -> Result<MemoryReading> {
        Ok(MemoryReading {
            total_bytes: 16 * 1024 * 1024 * 1024,
            available_bytes: 4 * 1024 * 1024 * 1024,
        })
    }
}

/// Counters that grow by a fixed amount per read.
struct GrowingCounters {
    reads: AtomicU64,
}

impl NetworkCounterProvider for GrowingCounters {
    fn counters(&mut self) -> Result<NetworkCounters> {
        let n = self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(NetworkCounters {
            bytes_sent: n * 2048,
            bytes_received: n * 1024,
        })
    }
}

struct FlakyProcesses {
    calls: u32,
}

impl ProcessProvider for FlakyProcesses {
    fn processes(&mut self) -> Result<Vec<ProcessRecord>> {
        self.calls += 1;
        if self.calls == 2 {
            return Err(TelemetryError::provider_error("process table busy"));
        }
        Ok(vec![ProcessRecord {
            pid: 42,
            name: "renderer".to_string(),
            cpu_percent: 12.5,
            memory_percent: 3.0,
            threads: Some(8),
        }])
    }
}

#[derive(Clone, Default)]
struct RecordingLibrary {
    calls: Arc<Mutex<Vec<(usize, i32)>>>,
}

impl TuningLibrary for RecordingLibrary {
    fn set_cpu_multiplier(&self, core: usize, multiplier: i32) -> Result<()> {
        self.calls.lock().unwrap().push((core, multiplier));
        Ok(())
    }
}

fn identity() -> SystemSnapshot {
    SystemSnapshot {
        captured_at: Utc::now(),
        cpu: CpuIdentity {
            name: "Test CPU".to_string(),
            architecture: "x86_64".to_string(),
            physical_cores: 2,
            threads: 2,
            frequency_mhz: Some(3400),
        },
        os_name: "TestOS".to_string(),
        os_version: "1.0".to_string(),
        kernel_version: "6.0".to_string(),
        total_memory_bytes: 16 * 1024 * 1024 * 1024,
        board: "Vendor Board".to_string(),
    }
}

fn providers() -> Providers {
    Providers {
        cpu: Box::new(FixedLoad(vec![25.0, 140.0])),
        memory: Box::new(FixedMemory),
        network: Box::new(GrowingCounters {
            reads: AtomicU64::new(0),
        }),
        gpu: None,
        frequency: Box::new(FixedClocks),
        label_memory: Box::new(FixedMemory),
        processes: Box::new(FlakyProcesses { calls: 0 }),
    }
}

fn engine_with(capability: TuningCapability) -> TelemetryEngine {
    TelemetryEngine::from_parts(EngineConfig::default(), identity(), providers(), capability)
        .expect("Should build engine")
}

fn timestamps(engine: &TelemetryEngine, id: &str) -> Vec<f64> {
    engine
        .view()
        .channel(id)
        .expect("channel exists")
        .samples
        .iter()
        .map(|sample| sample.t)
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_engine_samples_on_cadence_and_drains() {
    let engine = engine_with(TuningCapability::absent("no library in tests"));
    let handle = engine.handle();
    let (_commands_tx, commands) = tokio::sync::mpsc::channel(4);

    let task = tokio::spawn(engine.run(commands));
    tokio::time::sleep(Duration::from_millis(3500)).await;
    handle.stop();
    let engine = task.await.expect("engine task should not panic");

    assert_eq!(engine.scheduler().lifecycle(), Lifecycle::Stopped);

    let times = timestamps(&engine, "cpu.core0");
    assert_eq!(times.len(), 4);
    for (expected, actual) in [0.0, 1.0, 2.0, 3.0].iter().zip(&times) {
        assert!((expected - actual).abs() < 1e-6, "{:?}", times);
    }

    // Out-of-range load is clamped
    let core1 = engine.view().channel("cpu.core1").unwrap().samples.clone();
    assert!(core1.iter().all(|sample| sample.value == 100.0));

    // Process list: first tick ok, second failed and kept the previous list
    assert_eq!(engine.scheduler().ticks(Domain::Processes), Some(2));
    let view = engine.view();
    assert_eq!(view.processes.as_ref().map(Vec::len), Some(1));

    // First network tick is 0/0, then a steady rate
    let up = view.channel("network.up").unwrap();
    assert_eq!(up.samples[0].value, 0.0);
    assert!((up.samples[1].value - 2.0).abs() < 1e-9);

    // GPU missing: channel present, unavailable, empty
    let gpu = view.channel("gpu.utilization").unwrap();
    assert!(matches!(gpu.status, ChannelStatus::Unavailable { .. }));
    assert!(gpu.samples.is_empty());

    let labels = view.labels.as_ref().unwrap();
    assert_eq!(labels.available_memory, "Available RAM: 4 GB");
    assert!(labels.core_speeds.starts_with("Core Speeds: Core 0: 3400.0 MHz"));
}

#[tokio::test(start_paused = true)]
async fn test_capacity_bounds_series() {
    let config = EngineConfig::default()
        .with_capacity(3)
        .with_domains([Domain::Cpu]);
    let engine = TelemetryEngine::from_parts(
        config,
        identity(),
        providers(),
        TuningCapability::absent("no library in tests"),
    )
    .unwrap();
    let handle = engine.handle();
    let (_tx, commands) = tokio::sync::mpsc::channel(1);

    let task = tokio::spawn(engine.run(commands));
    tokio::time::sleep(Duration::from_millis(5500)).await;
    handle.stop();
    let engine = task.await.unwrap();

    let times = timestamps(&engine, "cpu.core0");
    assert_eq!(times.len(), 3);
    assert!((times[0] - 3.0).abs() < 1e-6);
    assert!((times[2] - 5.0).abs() < 1e-6);
    assert!(engine.view().channel("memory.available").is_none());
}

#[tokio::test(start_paused = true)]
async fn test_engine_restart_keeps_sampling() {
    let config = EngineConfig::default().with_domains([Domain::Cpu, Domain::Network]);
    let engine = TelemetryEngine::from_parts(
        config,
        identity(),
        providers(),
        TuningCapability::absent("no library in tests"),
    )
    .unwrap();
    let handle = engine.handle();

    let (_tx, commands) = tokio::sync::mpsc::channel(1);
    let task = tokio::spawn(engine.run(commands));
    tokio::time::sleep(Duration::from_millis(2500)).await;
    handle.stop();
    let engine = task.await.unwrap();
    assert_eq!(timestamps(&engine, "cpu.core0").len(), 3);

    let (_tx, commands) = tokio::sync::mpsc::channel(1);
    let task = tokio::spawn(engine.run(commands));
    tokio::time::sleep(Duration::from_millis(2200)).await;
    handle.stop();
    let engine = task.await.unwrap();

    let times = timestamps(&engine, "cpu.core0");
    let expected = [0.0, 1.0, 2.0, 2.5, 3.5, 4.5];
    assert_eq!(times.len(), expected.len(), "{:?}", times);
    for (expected, actual) in expected.iter().zip(&times) {
        assert!((expected - actual).abs() < 1e-6, "{:?}", times);
    }
    assert!(times.windows(2).all(|pair| pair[0] <= pair[1]));

    let view = engine.view();
    assert_eq!(view.channel("cpu.core0").unwrap().skipped_ticks, 0);

    // Rates restart from a fresh baseline
    let up: Vec<f64> = view
        .channel("network.up")
        .unwrap()
        .samples
        .iter()
        .map(|sample| sample.value)
        .collect();
    assert_eq!(up.len(), 6);
    assert_eq!(up[0], 0.0);
    assert!((up[2] - 2.0).abs() < 1e-9);
    assert_eq!(up[3], 0.0);
    assert!((up[4] - 2.0).abs() < 1e-9);
}

#[tokio::test(start_paused = true)]
async fn test_actuation_runs_on_engine_loop() {
    let library = RecordingLibrary::default();
    let engine = engine_with(TuningCapability::Bound(Box::new(library.clone())));
    let handle = engine.handle();
    let (state, commands) = AppState::for_engine(&engine, 4);
    let task = tokio::spawn(engine.run(commands));

    let (reply, response) = tokio::sync::oneshot::channel();
    state
        .commands
        .send(vortex_telemetry::EngineCommand::SetMultiplier {
            core: 1,
            value: 44,
            reply,
        })
        .await
        .unwrap();
    let result: ActuationResult = response.await.unwrap();
    assert!(result.applied);
    assert_eq!(*library.calls.lock().unwrap(), vec![(1, 44)]);

    let view = state.current_view();
    assert_eq!(view.cores[1].multiplier, 44);
    assert_eq!(view.last_actuation.as_ref(), Some(&result));

    handle.stop();
    task.await.unwrap();
}

async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_web_api_reads_and_controls() {
    let engine = engine_with(TuningCapability::absent("overclock.so missing"));
    let handle = engine.handle();
    let (state, commands) = AppState::for_engine(&engine, 4);
    let task = tokio::spawn(engine.run(commands));
    let app = create_app(&WebConfig::default(), state);

    let response = app
        .clone()
        .oneshot(Request::get("/api/system").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let system = read_json(response).await;
    assert_eq!(system["cpu"]["physical_cores"], 2);

    let response = app
        .clone()
        .oneshot(Request::get("/api/cores").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let cores = read_json(response).await;
    assert_eq!(cores[0]["multiplier"], 30);

    let response = app
        .clone()
        .oneshot(Request::get("/api/channels/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Library absent
    let response = app
        .clone()
        .oneshot(
            Request::post("/api/cores/0/multiplier")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"value": 40}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = read_json(response).await;
    assert_eq!(body["applied"], false);
    assert_eq!(body["error"]["kind"], "library_unavailable");

    // Validation happens before the library is consulted
    let response = app
        .clone()
        .oneshot(
            Request::post("/api/cores/7/multiplier")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"value": 40}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json(response).await;
    assert_eq!(body["error"]["kind"], "core_out_of_range");

    // Voltage needs no library
    let response = app
        .clone()
        .oneshot(
            Request::post("/api/cores/1/voltage")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"value": 1.15}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(Request::get("/api/dashboard").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let dashboard = read_json(response).await;
    assert_eq!(dashboard["cores"][1]["voltage"], 1.15);
    assert_eq!(dashboard["lifecycle"], "running");

    handle.stop();
    task.await.unwrap();

    // Engine gone: control requests are refused
    let response = app
        .oneshot(
            Request::post("/api/cores/0/voltage")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"value": 1.0}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
