use bugtrack_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Start request sent to the external load-test service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadTestRequest {
    url: String,
    threads: u32,
    duration: u32,
}

impl LoadTestRequest {
    /// Virtual users used when advanced settings are not provided.
    pub const DEFAULT_THREADS: u32 = 5;
    /// Run length in seconds used when advanced settings are not provided.
    pub const DEFAULT_DURATION_SECS: u32 = 10;

    /// Validates a start request. `None` settings fall back to the defaults.
    pub fn new(
        url: impl Into<String>,
        threads: Option<u32>,
        duration_secs: Option<u32>,
    ) -> AppResult<Self> {
        let url = url.into().trim().to_owned();
        if url.is_empty() {
            return Err(AppError::Validation(
                "target url must not be empty".to_owned(),
            ));
        }

        let threads = threads.unwrap_or(Self::DEFAULT_THREADS);
        let duration = duration_secs.unwrap_or(Self::DEFAULT_DURATION_SECS);
        if threads == 0 || duration == 0 {
            return Err(AppError::Validation(
                "threads and duration must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            url,
            threads,
            duration,
        })
    }

    /// Returns the target URL.
    #[must_use]
    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns the number of virtual users.
    #[must_use]
    pub fn threads(&self) -> u32 {
        self.threads
    }

    /// Returns the run length in seconds.
    #[must_use]
    pub fn duration_secs(&self) -> u32 {
        self.duration
    }
}

/// Aggregated latency row for one sampled endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadTestReport {
    /// Endpoint label, e.g. `Main Page`.
    pub label: String,
    /// Number of samples taken.
    pub samples: u64,
    /// Mean latency in milliseconds.
    pub average: f64,
    /// Fastest sample in milliseconds.
    pub min: f64,
    /// Slowest sample in milliseconds.
    pub max: f64,
    /// Requests per second.
    pub throughput: f64,
    /// Failed samples in percent.
    pub error_rate: f64,
}

/// Event emitted by the load-test service's event stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LoadTestEvent {
    /// Progress message.
    Status {
        /// Human-readable progress text.
        message: String,
    },
    /// Latest aggregate table.
    Report {
        /// One row per sampled endpoint.
        data: Vec<LoadTestReport>,
    },
    /// Terminal failure.
    Error {
        /// Failure description.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::{LoadTestEvent, LoadTestRequest};

    #[test]
    fn request_uses_defaults() {
        let request = LoadTestRequest::new("https://example.com", None, None);
        assert_eq!(
            request.ok().map(|request| (request.threads(), request.duration_secs())),
            Some((5, 10))
        );
    }

    #[test]
    fn request_rejects_blank_url() {
        assert!(LoadTestRequest::new("  ", Some(2), Some(3)).is_err());
    }

    #[test]
    fn report_event_parses_camel_case_rows() {
        let event: Result<LoadTestEvent, _> = serde_json::from_str(
            r#"{"type":"report","data":[{"label":"Main Page","samples":40,"average":120.5,"min":80,"max":300,"throughput":12.4,"errorRate":2.5}]}"#,
        );

        match event {
            Ok(LoadTestEvent::Report { data }) => {
                assert_eq!(data.len(), 1);
                assert_eq!(data[0].label, "Main Page");
                assert!((data[0].error_rate - 2.5).abs() < f64::EPSILON);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
