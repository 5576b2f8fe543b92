use crate::error::{EncryptException, Result, ServiceError};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Turns a validated plaintext payload into an opaque token.
#[async_trait]
pub trait EncryptionService: Send + Sync {
    async fn encrypt(&self, plain: String) -> std::result::Result<String, ServiceError>;
}

pub type EncryptionServiceBox = Arc<dyn EncryptionService>;

/// Source of "today" for expiry checks and year normalization.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

pub type ClockBox = Arc<dyn Clock>;

pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// The execution context callbacks are delivered on.
///
/// Implementations must run jobs one at a time, in submission order.
pub trait CallbackExecutor: Send + Sync {
    fn execute(&self, job: Job) -> Result<()>;
}

pub type CallbackExecutorBox = Arc<dyn CallbackExecutor>;

pub type EncryptOutcome = std::result::Result<String, EncryptException>;

/// Receives the terminal outcome of one encrypt call.
///
/// Both methods consume the callback, so at most one of them ever runs.
pub trait EncryptCallback: Send + 'static {
    fn on_success(self: Box<Self>, token: String);
    fn on_error(self: Box<Self>, exception: EncryptException);
}

impl dyn EncryptCallback {
    pub fn deliver(self: Box<Self>, outcome: EncryptOutcome) {
        match outcome {
            Ok(token) => self.on_success(token),
            Err(exception) => self.on_error(exception),
        }
    }
}

/// Adapts a closure over the outcome into an [`EncryptCallback`].
pub struct FnCallback<F>(F);

impl<F> EncryptCallback for FnCallback<F>
where
    F: FnOnce(EncryptOutcome) + Send + 'static,
{
    fn on_success(self: Box<Self>, token: String) {
        let FnCallback(f) = *self;
        f(Ok(token))
    }

    fn on_error(self: Box<Self>, exception: EncryptException) {
        let FnCallback(f) = *self;
        f(Err(exception))
    }
}

pub fn callback_fn<F>(f: F) -> Box<dyn EncryptCallback>
where
    F: FnOnce(EncryptOutcome) + Send + 'static,
{
    Box::new(FnCallback(f))
}

/// Bridges the callback protocol to an awaitable receiver. A dropped callback
/// (for example after cancellation) surfaces as a closed channel.
impl EncryptCallback for oneshot::Sender<EncryptOutcome> {
    fn on_success(self: Box<Self>, token: String) {
        let _ = (*self).send(Ok(token));
    }

    fn on_error(self: Box<Self>, exception: EncryptException) {
        let _ = (*self).send(Err(exception));
    }
}
