use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use bugtrack_core::{AppError, AppResult};
use bugtrack_domain::{LoadTestEvent, LoadTestReport, LoadTestRequest};
use chrono::Utc;
use tokio::sync::Mutex;

use crate::{LoadTestEventStream, LoadTestGateway};

use super::{CHART_CAPACITY, LoadTestMonitor, LoadTestService};

struct ScriptedStream {
    events: VecDeque<AppResult<Option<LoadTestEvent>>>,
}

#[async_trait]
impl LoadTestEventStream for ScriptedStream {
    async fn next_event(&mut self) -> AppResult<Option<LoadTestEvent>> {
        self.events.pop_front().unwrap_or(Ok(None))
    }
}

#[derive(Default)]
struct FakeGateway {
    calls: Mutex<Vec<&'static str>>,
    script: Mutex<Vec<AppResult<Option<LoadTestEvent>>>>,
    fail_start: bool,
}

#[async_trait]
impl LoadTestGateway for FakeGateway {
    async fn start(&self, _request: &LoadTestRequest) -> AppResult<()> {
        self.calls.lock().await.push("start");
        if self.fail_start {
            return Err(AppError::Remote("connection refused".to_owned()));
        }
        Ok(())
    }

    async fn open_events(&self) -> AppResult<Box<dyn LoadTestEventStream>> {
        self.calls.lock().await.push("open_events");
        let events = std::mem::take(&mut *self.script.lock().await);
        Ok(Box::new(ScriptedStream {
            events: events.into_iter().collect(),
        }))
    }
}

fn row(label: &str, average: f64) -> LoadTestReport {
    LoadTestReport {
        label: label.to_owned(),
        samples: 10,
        average,
        min: average / 2.0,
        max: average * 2.0,
        throughput: 4.0,
        error_rate: 0.0,
    }
}

fn status(message: &str) -> AppResult<Option<LoadTestEvent>> {
    Ok(Some(LoadTestEvent::Status {
        message: message.to_owned(),
    }))
}

fn request() -> LoadTestRequest {
    match LoadTestRequest::new("https://example.com", None, None) {
        Ok(request) => request,
        Err(error) => panic!("request should be valid: {error}"),
    }
}

#[tokio::test]
async fn stream_is_opened_before_start_and_error_ends_run() {
    let gateway = Arc::new(FakeGateway {
        script: Mutex::new(vec![
            status("Warming up"),
            Ok(Some(LoadTestEvent::Report {
                data: vec![row("Main Page", 120.0), row("API", 40.0)],
            })),
            Ok(Some(LoadTestEvent::Error {
                message: "target unreachable".to_owned(),
            })),
            status("never seen"),
        ]),
        ..FakeGateway::default()
    });
    let service = LoadTestService::new(gateway.clone());
    let mut statuses = Vec::new();

    let monitor = service
        .run(&request(), |monitor| statuses.push(monitor.status().to_owned()))
        .await;

    assert_eq!(*gateway.calls.lock().await, vec!["open_events", "start"]);
    assert!(!monitor.is_running());
    assert_eq!(monitor.status(), "Error: target unreachable");
    assert_eq!(monitor.reports().len(), 2);
    assert_eq!(monitor.chart().count(), 1);
    assert_eq!(statuses.first().map(String::as_str), Some("Initializing test..."));
    assert!(!statuses.iter().any(|status| status == "never seen"));
}

#[tokio::test]
async fn failed_start_sets_status() {
    let gateway = Arc::new(FakeGateway {
        fail_start: true,
        ..FakeGateway::default()
    });
    let service = LoadTestService::new(gateway);

    let monitor = service.run(&request(), |_| {}).await;

    assert!(!monitor.is_running());
    assert!(monitor.status().starts_with("Failed to start test"));
}

#[tokio::test]
async fn completion_status_ends_run() {
    let gateway = Arc::new(FakeGateway {
        script: Mutex::new(vec![status("Test Completed"), status("never seen")]),
        ..FakeGateway::default()
    });
    let service = LoadTestService::new(gateway);

    let monitor = service.run(&request(), |_| {}).await;

    assert_eq!(monitor.status(), "Test Completed");
    assert!(!monitor.is_running());
}

#[test]
fn chart_keeps_latest_main_page_points() {
    let mut monitor = LoadTestMonitor::default();
    monitor.begin();

    for step in 0..25_u32 {
        monitor.apply(
            LoadTestEvent::Report {
                data: vec![row("Main Page", f64::from(step))],
            },
            Utc::now(),
        );
    }
    monitor.apply(
        LoadTestEvent::Report {
            data: vec![row("Checkout", 99.0)],
        },
        Utc::now(),
    );

    let latencies: Vec<f64> = monitor.chart().map(|point| point.latency).collect();
    assert_eq!(latencies.len(), CHART_CAPACITY);
    assert_eq!(latencies.first().copied(), Some(5.0));
    assert_eq!(latencies.last().copied(), Some(24.0));
    assert_eq!(monitor.reports()[0].label, "Checkout");
    assert!(monitor.is_running());
}
