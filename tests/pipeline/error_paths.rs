use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use anyhow::Result;
use exodus_fetch::{ListenerEvent, ManagerConfig, NetworkError, NetworkManager, ProgressStep};

use crate::support::helpers::{
    events_for, init_tracing, offline_context, online_context, success_count, wait_for,
    RecordingStore, TaggedListener, REPORTS_BODY, TRACKERS_BODY,
};
use crate::support::mock_api::{MockApi, MockApiServer};

fn manager_for(url: &str) -> Result<NetworkManager> {
    let config = ManagerConfig::builder()
        .api_url(url)
        .request_timeout(Duration::from_secs(5))
        .build()?;
    NetworkManager::new(config)
}

fn is_step(event: &ListenerEvent, expected: ProgressStep) -> bool {
    matches!(event, ListenerEvent::Progress { step, .. } if *step == expected)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn offline_request_reports_not_connected_without_touching_the_api() -> Result<()> {
    init_tracing();

    let api = MockApi::new(TRACKERS_BODY, REPORTS_BODY);
    let server = MockApiServer::start(api.clone()).await?;
    let manager = manager_for(server.url())?;

    let store = Arc::new(RecordingStore::default());
    let log = Arc::new(Mutex::new(Vec::new()));
    manager.submit(
        offline_context(store.clone()),
        TaggedListener::new("offline", &log),
        ["com.a"],
    );

    wait_for(Duration::from_secs(5), "offline request to be processed", || {
        manager.telemetry().snapshot().processed_items == 1
    })
    .await?;

    assert_eq!(
        events_for(&log, "offline"),
        vec![ListenerEvent::Error(NetworkError::NotConnected)]
    );
    assert!(api.requests().is_empty());
    assert!(store.tracker_batches().is_empty());
    assert_eq!(manager.telemetry().snapshot().connectivity_errors, 1);

    manager.stop().await;
    server.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn tracker_server_error_keeps_catalog_and_continues() -> Result<()> {
    init_tracing();

    let api = MockApi::new(TRACKERS_BODY, REPORTS_BODY);
    api.respond("/api/trackers", 500, "internal error");
    let server = MockApiServer::start(api.clone()).await?;
    let manager = manager_for(server.url())?;

    let store = Arc::new(RecordingStore::default());
    let log = Arc::new(Mutex::new(Vec::new()));
    manager.submit(
        online_context(store.clone()),
        TaggedListener::new("flaky", &log),
        ["com.a"],
    );

    wait_for(Duration::from_secs(5), "request to finish", || {
        success_count(&log) == 1
    })
    .await?;

    let events = events_for(&log, "flaky");
    assert!(!events
        .iter()
        .any(|event| matches!(event, ListenerEvent::Error(_))));
    assert!(!events
        .iter()
        .any(|event| is_step(event, ProgressStep::TrackersParsing)));
    assert!(store.tracker_batches().is_empty());
    assert_eq!(store.stored_applications(), vec!["com.a".to_string()]);

    manager.stop().await;
    server.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn invalid_tracker_json_is_reported_then_reports_still_stored() -> Result<()> {
    init_tracing();

    let api = MockApi::new("{\"trackers\": [oops", REPORTS_BODY);
    let server = MockApiServer::start(api.clone()).await?;
    let manager = manager_for(server.url())?;

    let store = Arc::new(RecordingStore::default());
    let log = Arc::new(Mutex::new(Vec::new()));
    manager.submit(
        online_context(store.clone()),
        TaggedListener::new("broken", &log),
        ["com.a", "com.b"],
    );

    wait_for(Duration::from_secs(5), "request to finish", || {
        success_count(&log) == 1
    })
    .await?;

    let events = events_for(&log, "broken");
    let error_at = events
        .iter()
        .position(|event| *event == ListenerEvent::Error(NetworkError::InvalidJson))
        .expect("invalid JSON reported");
    let reports_at = events
        .iter()
        .position(|event| is_step(event, ProgressStep::ReportsConnecting))
        .expect("reports phase started");
    assert!(error_at < reports_at);
    assert_eq!(events.last(), Some(&ListenerEvent::Success));

    assert!(store.tracker_batches().is_empty());
    let mut stored = store.stored_applications();
    stored.sort();
    assert_eq!(stored, vec!["com.a".to_string(), "com.b".to_string()]);
    assert_eq!(manager.telemetry().snapshot().json_errors, 1);

    manager.stop().await;
    server.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn malformed_report_dates_are_stored_without_timestamps() -> Result<()> {
    init_tracing();

    let reports = r#"{
      "applications": {
        "com.a": {
          "name": "App A",
          "creator": "Creator A",
          "reports": [
            {"id": 7, "downloads": "10+", "version": "0.1", "version_code": "7", "updated_at": "yesterday", "creation_date": "2018-01-01T00:00:00.000Z", "trackers": []}
          ]
        }
      }
    }"#;
    let api = MockApi::new(TRACKERS_BODY, reports);
    let server = MockApiServer::start(api.clone()).await?;
    let manager = manager_for(server.url())?;

    let store = Arc::new(RecordingStore::default());
    let log = Arc::new(Mutex::new(Vec::new()));
    manager.submit(
        online_context(store.clone()),
        TaggedListener::new("dates", &log),
        ["com.a"],
    );

    wait_for(Duration::from_secs(5), "request to finish", || {
        success_count(&log) == 1
    })
    .await?;

    let app = store.inner().application("com.a").expect("com.a stored");
    let report = app.latest_report().expect("report stored");
    assert_eq!(report.id, 7);
    assert_eq!(report.version_code, Some(7));
    assert!(report.updated_at.is_none());
    assert!(report.created_at.is_none());
    assert!(!events_for(&log, "dates")
        .iter()
        .any(|event| matches!(event, ListenerEvent::Error(_))));

    manager.stop().await;
    server.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unusable_base_url_abandons_items_silently() -> Result<()> {
    init_tracing();

    let manager = manager_for("http://[::1")?;
    let store = Arc::new(RecordingStore::default());
    let log = Arc::new(Mutex::new(Vec::new()));

    for tag in ["first", "second"] {
        manager.submit(
            online_context(store.clone()),
            TaggedListener::new(tag, &log),
            ["com.a"],
        );
    }

    wait_for(Duration::from_secs(5), "both requests to be processed", || {
        manager.telemetry().snapshot().processed_items == 2
    })
    .await?;

    for tag in ["first", "second"] {
        assert_eq!(
            events_for(&log, tag),
            vec![ListenerEvent::Progress {
                step: ProgressStep::TrackersConnecting,
                current: 0,
                total: 0,
            }]
        );
    }
    assert_eq!(manager.telemetry().snapshot().transport_failures, 2);
    assert!(store.tracker_batches().is_empty());

    manager.stop().await;
    Ok(())
}
