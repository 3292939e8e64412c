use std::io::Read;
use std::time::Duration;
use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::StreamFetcher;

/// Blocking HTTP fetcher. The body is streamed straight into the decoder.
#[derive(Clone)]
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    const DEFAULT_TIMEOUT_SECS: u64 = 30;
    const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

    pub fn new() -> Self {
        Self::with_timeouts(
            Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
            Duration::from_secs(Self::DEFAULT_CONNECT_TIMEOUT_SECS),
        )
    }

    pub fn with_timeouts(timeout: Duration, connect_timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new()
                .timeout(timeout)
                .timeout_connect(connect_timeout)
                .build(),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> PipelineResult<Box<dyn Read + Send>> {
        let response = self.agent
            .get(url)
            .call()
            .map_err(|e| PipelineError::network(url, e.to_string()))?;
        Ok(Box::new(response.into_reader()))
    }
}
