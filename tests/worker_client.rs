use chrono::DateTime;
use flowforge::{
    api::AppState,
    config::{Config, LivenessConfig},
    liveness::{LivenessTracker, ManualClock, RegisterRequest, WorkerClient, WorkerReport, BYTES_PER_GB},
    server::build_router,
    workflow::GraphStore,
};
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

async fn spawn_server(liveness: LivenessConfig) -> (String, AppState) {
    let clock = Arc::new(ManualClock::new(DateTime::from_timestamp_millis(0).unwrap()));
    let mut config = Config::default();
    config.liveness = liveness;
    let state = AppState {
        tracker: Arc::new(LivenessTracker::new(&config.liveness, clock)),
        graph: Arc::new(GraphStore::new()),
    };

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = build_router(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), state)
}

fn fast_liveness() -> LivenessConfig {
    LivenessConfig {
        heartbeat_interval_ms: 20,
        heartbeat_timeout_ms: 100,
        sweep_interval_ms: 50,
        broadcast_capacity: 16,
    }
}

#[tokio::test]
async fn client_registers_and_reports() {
    let (url, state) = spawn_server(LivenessConfig::default()).await;
    let mut client = WorkerClient::new(url);

    let registration = client
        .register(&RegisterRequest {
            name: Some("edge-1".to_string()),
            address: Some("10.0.0.5".to_string()),
            ..RegisterRequest::default()
        })
        .await
        .unwrap();
    assert_eq!(registration.worker_id, 1);
    assert_eq!(client.worker_id(), Some(1));
    assert_eq!(client.heartbeat_interval(), Duration::from_secs(30));

    let ack = client
        .heartbeat(&WorkerReport::usage(12.0, BYTES_PER_GB * 3.0, 0.0))
        .await
        .unwrap();
    assert_eq!(ack.status, "ok");

    client
        .report_metrics(&WorkerReport::usage(80.0, BYTES_PER_GB, BYTES_PER_GB * 5.0))
        .await
        .unwrap();

    let worker = state.tracker.get(1).await.unwrap();
    assert_eq!(worker.name, "edge-1");
    assert_eq!(worker.cpu.usage, 80.0);
    assert_eq!(worker.memory.used, 1.0);
    assert_eq!(worker.disk.used, 5.0);
}

#[tokio::test]
async fn client_surfaces_server_rejections() {
    let (url, state) = spawn_server(LivenessConfig::default()).await;
    let mut client = WorkerClient::new(url);

    assert!(client.register(&RegisterRequest::default()).await.is_err());
    assert!(client.worker_id().is_none());

    client
        .register(&RegisterRequest {
            address: Some("10.0.0.5".to_string()),
            ..RegisterRequest::default()
        })
        .await
        .unwrap();
    state.tracker.delete(1).await.unwrap();
    assert!(client.heartbeat(&WorkerReport::default()).await.is_err());
}

#[tokio::test]
async fn heartbeat_loop_follows_server_interval_until_cancelled() {
    let (url, state) = spawn_server(fast_liveness()).await;
    let mut client = WorkerClient::new(url);
    client
        .register(&RegisterRequest {
            address: Some("10.0.0.5".to_string()),
            ..RegisterRequest::default()
        })
        .await
        .unwrap();
    assert_eq!(client.heartbeat_interval(), Duration::from_millis(20));

    let cancel = CancellationToken::new();
    let loop_cancel = cancel.clone();
    let handle = tokio::spawn(async move {
        let source = || WorkerReport::usage(66.0, 0.0, 0.0);
        client.run(&source, loop_cancel).await
    });

    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if state.tracker.get(1).await.is_some_and(|w| w.cpu.usage == 66.0) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("heartbeat should reach the server");

    cancel.cancel();
    handle.await.unwrap().unwrap();
}
