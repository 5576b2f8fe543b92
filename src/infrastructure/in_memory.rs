use crate::domain::ports::EncryptionService;
use crate::error::ServiceError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// An encryption service that keeps every payload it receives in memory.
///
/// Tokens are `tok_<n>` where `n` counts calls from zero. A configurable delay
/// and failure make it suitable for exercising cancellation and error paths.
#[derive(Default, Clone)]
pub struct InMemoryEncryptionService {
    received: Arc<RwLock<Vec<String>>>,
    delay: Option<Duration>,
    failure: Option<ServiceError>,
}

impl InMemoryEncryptionService {
    /// Creates a service that answers immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits `delay` before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Answers every call with `failure`.
    pub fn failing(mut self, failure: ServiceError) -> Self {
        self.failure = Some(failure);
        self
    }

    /// Payloads received so far, oldest first.
    pub async fn received(&self) -> Vec<String> {
        self.received.read().await.clone()
    }
}

#[async_trait]
impl EncryptionService for InMemoryEncryptionService {
    async fn encrypt(&self, plain: String) -> Result<String, ServiceError> {
        let index = {
            let mut received = self.received.write().await;
            received.push(plain);
            received.len() - 1
        };

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.failure {
            Some(failure) => Err(failure.clone()),
            None => Ok(format!("tok_{index}")),
        }
    }
}
