//! Client for the external load-test service.

mod monitor;

use std::sync::Arc;

use bugtrack_domain::LoadTestRequest;
use chrono::Utc;
use tracing::{error, info};

use crate::LoadTestGateway;

pub use monitor::{CHART_CAPACITY, CHART_LABEL, ChartPoint, LoadTestMonitor};

/// Starts a run and follows its event stream.
#[derive(Clone)]
pub struct LoadTestService {
    gateway: Arc<dyn LoadTestGateway>,
}

impl LoadTestService {
    /// Creates a new load-test service.
    #[must_use]
    pub fn new(gateway: Arc<dyn LoadTestGateway>) -> Self {
        Self { gateway }
    }

    /// Runs one load test until it completes, fails or the stream closes.
    ///
    /// The event stream is opened before the start request so no early event
    /// is missed. `on_update` sees the monitor after every change.
    pub async fn run<F>(&self, request: &LoadTestRequest, mut on_update: F) -> LoadTestMonitor
    where
        F: FnMut(&LoadTestMonitor) + Send,
    {
        let mut monitor = LoadTestMonitor::default();
        monitor.begin();
        on_update(&monitor);

        let mut events = match self.gateway.open_events().await {
            Ok(events) => events,
            Err(open_error) => {
                error!(error = %open_error, "failed to open load-test event stream");
                monitor.fail_start();
                on_update(&monitor);
                return monitor;
            }
        };

        if let Err(start_error) = self.gateway.start(request).await {
            error!(error = %start_error, url = request.url(), "failed to start load test");
            monitor.fail_start();
            on_update(&monitor);
            return monitor;
        }
        info!(
            url = request.url(),
            threads = request.threads(),
            duration_secs = request.duration_secs(),
            "load test started"
        );

        loop {
            match events.next_event().await {
                Ok(Some(event)) => {
                    let running = monitor.apply(event, Utc::now());
                    on_update(&monitor);
                    if !running {
                        break;
                    }
                }
                Ok(None) => {
                    monitor.finish();
                    on_update(&monitor);
                    break;
                }
                Err(stream_error) => {
                    error!(error = %stream_error, "load-test event stream failed");
                    monitor.fail(stream_error.message());
                    on_update(&monitor);
                    break;
                }
            }
        }

        info!(status = monitor.status(), "load test finished");
        monitor
    }
}

#[cfg(test)]
mod tests;
