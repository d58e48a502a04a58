//! HTTP client for the external load-test service.

mod event_decoder;

use std::collections::VecDeque;

use async_trait::async_trait;
use bugtrack_application::{LoadTestEventStream, LoadTestGateway};
use bugtrack_core::{AppError, AppResult};
use bugtrack_domain::{LoadTestEvent, LoadTestRequest};
use reqwest::header;
use url::Url;

use event_decoder::EventDecoder;

/// Load-test gateway speaking `POST /start` and a server-sent `GET /events` stream.
pub struct HttpLoadTestGateway {
    http_client: reqwest::Client,
    base_url: Url,
}

impl HttpLoadTestGateway {
    /// Creates a gateway for the service mounted at `base_url`.
    ///
    /// The client must not carry a total request timeout, the event stream
    /// stays open for the whole run.
    pub fn new(http_client: reqwest::Client, base_url: &str) -> AppResult<Self> {
        let base_url = Url::parse(base_url).map_err(|error| {
            AppError::Validation(format!("invalid load-test url '{base_url}': {error}"))
        })?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    fn endpoint(&self, name: &str) -> AppResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                AppError::Validation(format!(
                    "load-test url '{}' cannot carry a path",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .push(name);
        Ok(url)
    }
}

#[async_trait]
impl LoadTestGateway for HttpLoadTestGateway {
    async fn start(&self, request: &LoadTestRequest) -> AppResult<()> {
        let response = self
            .http_client
            .post(self.endpoint("start")?)
            .json(request)
            .send()
            .await
            .map_err(|error| AppError::Remote(format!("failed to start load test: {error}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_owned());
            return Err(AppError::Remote(format!(
                "load-test service rejected start with status {status}: {body}"
            )));
        }

        Ok(())
    }

    async fn open_events(&self) -> AppResult<Box<dyn LoadTestEventStream>> {
        let response = self
            .http_client
            .get(self.endpoint("events")?)
            .header(header::ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|error| {
                AppError::Remote(format!("failed to open load-test events: {error}"))
            })?;

        if !response.status().is_success() {
            return Err(AppError::Remote(format!(
                "load-test event stream answered with status {}",
                response.status()
            )));
        }

        Ok(Box::new(HttpLoadTestEventStream {
            response,
            decoder: EventDecoder::default(),
            pending: VecDeque::new(),
        }))
    }
}

struct HttpLoadTestEventStream {
    response: reqwest::Response,
    decoder: EventDecoder,
    pending: VecDeque<String>,
}

#[async_trait]
impl LoadTestEventStream for HttpLoadTestEventStream {
    async fn next_event(&mut self) -> AppResult<Option<LoadTestEvent>> {
        loop {
            while let Some(data) = self.pending.pop_front() {
                match serde_json::from_str::<LoadTestEvent>(data.as_str()) {
                    Ok(event) => return Ok(Some(event)),
                    Err(error) => {
                        tracing::warn!(
                            error = %error,
                            data = %data,
                            "skipping malformed load-test event"
                        );
                    }
                }
            }

            let chunk = self.response.chunk().await.map_err(|error| {
                AppError::Remote(format!("load-test event stream failed: {error}"))
            })?;

            match chunk {
                Some(bytes) => self.pending.extend(self.decoder.push(&bytes)),
                None => {
                    self.pending.extend(self.decoder.finish());
                    if self.pending.is_empty() {
                        return Ok(None);
                    }
                }
            }
        }
    }
}
