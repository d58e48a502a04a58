use std::collections::VecDeque;

use bugtrack_domain::{LoadTestEvent, LoadTestReport};
use chrono::{DateTime, Utc};

/// Number of chart points kept while a run streams reports.
pub const CHART_CAPACITY: usize = 20;

/// Report row that feeds the latency chart.
pub const CHART_LABEL: &str = "Main Page";

/// One point of the latency and throughput chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartPoint {
    /// When the report arrived.
    pub time: DateTime<Utc>,
    /// Mean latency in milliseconds.
    pub latency: f64,
    /// Requests per second.
    pub throughput: f64,
}

/// Observable state of a load-test run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadTestMonitor {
    status: String,
    reports: Vec<LoadTestReport>,
    chart: VecDeque<ChartPoint>,
    running: bool,
}

impl LoadTestMonitor {
    /// Resets state for a new run.
    pub fn begin(&mut self) {
        *self = Self {
            status: "Initializing test...".to_owned(),
            running: true,
            ..Self::default()
        };
    }

    /// Marks the run as failed before any event arrived.
    pub fn fail_start(&mut self) {
        self.status =
            "Failed to start test. Ensure the load-test service is running.".to_owned();
        self.running = false;
    }

    /// Ends the run with an error status.
    pub fn fail(&mut self, message: &str) {
        self.status = format!("Error: {message}");
        self.running = false;
    }

    /// Ends the run when the event stream closes.
    pub fn finish(&mut self) {
        self.running = false;
    }

    /// Folds one event into the state. Returns whether the run continues.
    pub fn apply(&mut self, event: LoadTestEvent, received_at: DateTime<Utc>) -> bool {
        match event {
            LoadTestEvent::Status { message } => {
                let completed = message.to_lowercase().contains("complete");
                self.status = message;
                if completed {
                    self.running = false;
                }
            }
            LoadTestEvent::Report { data } => {
                if let Some(main) = data.iter().find(|row| row.label == CHART_LABEL) {
                    if self.chart.len() == CHART_CAPACITY {
                        self.chart.pop_front();
                    }
                    self.chart.push_back(ChartPoint {
                        time: received_at,
                        latency: main.average,
                        throughput: main.throughput,
                    });
                }
                self.reports = data;
            }
            LoadTestEvent::Error { message } => self.fail(message.as_str()),
        }

        self.running
    }

    /// Current status line.
    #[must_use]
    pub fn status(&self) -> &str {
        self.status.as_str()
    }

    /// Latest report table.
    #[must_use]
    pub fn reports(&self) -> &[LoadTestReport] {
        &self.reports
    }

    /// Chart points, oldest first.
    pub fn chart(&self) -> impl Iterator<Item = &ChartPoint> {
        self.chart.iter()
    }

    /// Whether the run is still streaming.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }
}
