use async_trait::async_trait;
use bugtrack_core::AppResult;
use bugtrack_domain::{LoadTestEvent, LoadTestRequest};

/// Open event stream from the load-test service.
#[async_trait]
pub trait LoadTestEventStream: Send {
    /// Waits for the next event. `Ok(None)` means the stream ended.
    async fn next_event(&mut self) -> AppResult<Option<LoadTestEvent>>;
}

/// Port for the external load-test service.
#[async_trait]
pub trait LoadTestGateway: Send + Sync {
    /// Asks the service to start a run.
    async fn start(&self, request: &LoadTestRequest) -> AppResult<()>;

    /// Subscribes to the service's event stream.
    async fn open_events(&self) -> AppResult<Box<dyn LoadTestEventStream>>;
}
