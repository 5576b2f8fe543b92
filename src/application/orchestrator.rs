use crate::domain::brand::{self, CardBrand};
use crate::domain::ports::{
    CallbackExecutor, CallbackExecutorBox, ClockBox, EncryptCallback, EncryptOutcome,
    EncryptionServiceBox,
};
use crate::domain::request::{CardDetails, CardEncryptRequest, CvvEncryptRequest, EncryptRequest};
use crate::domain::validation::{self, ValidationErrorCode};
use crate::error::{CseError, EncryptException, EncryptExceptionCode, Result};
use crate::infrastructure::clock::SystemClock;
use crate::infrastructure::executor::SerialExecutor;
use chrono::NaiveDate;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

struct InFlight {
    id: u64,
    token: CancellationToken,
}

#[derive(Default)]
struct State {
    errors: Vec<ValidationErrorCode>,
    current: Option<InFlight>,
}

fn lock(state: &Mutex<State>) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Frees the single-flight slot when dropped.
///
/// Travels with the result onto the executor, so the task stays cancellable
/// until its callback is about to run.
struct SlotGuard {
    state: Arc<Mutex<State>>,
    id: u64,
    token: CancellationToken,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        let mut state = lock(&self.state);
        if state.current.as_ref().is_some_and(|c| c.id == self.id) {
            state.current = None;
        }
    }
}

/// Validates card requests and drives at most one encryption at a time.
///
/// Validation and request assembly run synchronously on the caller. Only the
/// call into the [`EncryptionService`](crate::domain::ports::EncryptionService)
/// runs on the Tokio runtime. Every outcome, including validation failures, is
/// delivered through the callback on the configured [`CallbackExecutor`].
///
/// A second `encrypt` while one is outstanding is answered with
/// [`EncryptExceptionCode::RequestInFlight`]; the running task is left alone.
/// The orchestrator may be shared between threads.
pub struct EncryptionOrchestrator {
    service: EncryptionServiceBox,
    clock: ClockBox,
    executor: CallbackExecutorBox,
    runtime: Handle,
    state: Arc<Mutex<State>>,
    next_id: AtomicU64,
}

impl EncryptionOrchestrator {
    /// Creates an orchestrator using the system clock and a dedicated
    /// callback thread.
    ///
    /// # Errors
    ///
    /// Fails if the callback thread cannot be spawned.
    pub fn new(service: EncryptionServiceBox, runtime: Handle) -> Result<Self> {
        let executor = SerialExecutor::start()?;
        Ok(Self::with_parts(
            service,
            Arc::new(SystemClock),
            Arc::new(executor),
            runtime,
        ))
    }

    /// Creates an orchestrator from explicit ports.
    pub fn with_parts(
        service: EncryptionServiceBox,
        clock: ClockBox,
        executor: CallbackExecutorBox,
        runtime: Handle,
    ) -> Self {
        Self {
            service,
            clock,
            executor,
            runtime,
            state: Arc::new(Mutex::new(State::default())),
            next_id: AtomicU64::new(0),
        }
    }

    /// Replaces the clock used for expiry checks.
    pub fn with_clock(mut self, clock: ClockBox) -> Self {
        self.clock = clock;
        self
    }

    /// See [`validation::is_valid_pan`].
    pub fn is_valid_pan(&self, pan: &str) -> bool {
        validation::is_valid_pan(pan)
    }

    /// See [`validation::is_valid_cvv`].
    pub fn is_valid_cvv(&self, cvv: &str, pan: Option<&str>) -> bool {
        validation::is_valid_cvv(cvv, pan)
    }

    /// Expiry check against today's date from the configured clock.
    pub fn is_valid_expiry(&self, month: i32, year: i32) -> bool {
        validation::is_valid_expiry(month, year, self.clock.today())
    }

    /// See [`validation::is_valid_card_holder_name`].
    pub fn is_valid_card_holder_name(&self, name: &str) -> bool {
        validation::is_valid_card_holder_name(name)
    }

    /// See [`validation::is_valid_card_token`].
    pub fn is_valid_card_token(&self, token: &str) -> bool {
        validation::is_valid_card_token(token)
    }

    /// Brand of `pan`, [`CardBrand::Unknown`] when nothing matches.
    pub fn detect_brand(&self, pan: &str) -> CardBrand {
        brand::detect_brand(pan)
    }

    /// Field errors from the most recent `encrypt` that failed validation.
    pub fn errors(&self) -> Vec<ValidationErrorCode> {
        lock(&self.state).errors.clone()
    }

    /// True when the last `encrypt` failed validation.
    pub fn has_errors(&self) -> bool {
        !lock(&self.state).errors.is_empty()
    }

    /// True while an encryption task is outstanding.
    pub fn is_busy(&self) -> bool {
        lock(&self.state).current.is_some()
    }

    /// Validates and encrypts full card details.
    pub fn encrypt_card(&self, details: CardDetails, callback: Box<dyn EncryptCallback>) {
        self.submit(
            move |today| Box::new(CardEncryptRequest::new(details, today)),
            callback,
        );
    }

    /// Validates and encrypts a CVV on its own.
    pub fn encrypt_cvv(&self, cvv: &str, nonce: &str, callback: Box<dyn EncryptCallback>) {
        let request = CvvEncryptRequest::new(cvv, nonce);
        self.submit(move |_| Box::new(request), callback);
    }

    /// Validates and encrypts any request.
    pub fn encrypt(&self, request: Box<dyn EncryptRequest>, callback: Box<dyn EncryptCallback>) {
        self.submit(move |_| request, callback);
    }

    /// Best-effort abort of the outstanding task. A no-op when idle.
    ///
    /// The cancelled task's callback is dropped without being invoked. This
    /// holds until the executor starts running the callback job, including
    /// when the service has already answered.
    pub fn cancel(&self) {
        let current = lock(&self.state).current.take();
        if let Some(task) = current {
            debug!(task = task.id, "cancelling encryption task");
            task.token.cancel();
        }
    }

    fn submit<F>(&self, build: F, callback: Box<dyn EncryptCallback>)
    where
        F: FnOnce(NaiveDate) -> Box<dyn EncryptRequest>,
    {
        lock(&self.state).errors.clear();

        let prepared = panic::catch_unwind(AssertUnwindSafe(|| {
            let today = self.clock.today();
            let request = build(today);
            let report = request.validate(today);
            if report.is_valid() {
                Ok(request.plain())
            } else {
                Err(report.into_errors())
            }
        }));

        match prepared {
            Ok(Ok(plain)) => self.start(plain, callback),
            Ok(Err(errors)) => {
                info!(?errors, "encrypt request failed validation");
                lock(&self.state).errors = errors;
                dispatch(
                    self.executor.as_ref(),
                    callback,
                    Err(EncryptException::new(
                        EncryptExceptionCode::ValidationFailed,
                    )),
                    None,
                );
            }
            Err(payload) => {
                let fault = CseError::Fault(panic_message(payload.as_ref()));
                warn!(error = %fault, "encrypt request could not be prepared");
                dispatch(
                    self.executor.as_ref(),
                    callback,
                    Err(EncryptException::with_cause(
                        EncryptExceptionCode::UnknownException,
                        fault,
                    )),
                    None,
                );
            }
        }
    }

    fn start(&self, plain: String, callback: Box<dyn EncryptCallback>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();

        {
            let mut state = lock(&self.state);
            if state.current.is_some() {
                drop(state);
                warn!("encrypt rejected, another request is in flight");
                dispatch(
                    self.executor.as_ref(),
                    callback,
                    Err(EncryptException::new(EncryptExceptionCode::RequestInFlight)),
                    None,
                );
                return;
            }
            state.current = Some(InFlight {
                id,
                token: token.clone(),
            });
        }

        let guard = SlotGuard {
            state: self.state.clone(),
            id,
            token: token.clone(),
        };
        let service = self.service.clone();
        let executor = self.executor.clone();
        debug!(task = id, "encryption task started");

        self.runtime.spawn(async move {
            // Run the service on its own task so a panic surfaces as a JoinError.
            let call = tokio::spawn(async move { service.encrypt(plain).await });
            let abort = call.abort_handle();

            let outcome = tokio::select! {
                biased;
                () = token.cancelled() => {
                    abort.abort();
                    None
                }
                joined = call => Some(match joined {
                    Ok(result) => result.map_err(EncryptException::from),
                    Err(e) => Err(join_fault(e)),
                }),
            };

            match outcome {
                None => debug!(task = id, "encryption task cancelled"),
                Some(result) => {
                    debug!(task = id, ok = result.is_ok(), "encryption task finished");
                    dispatch(executor.as_ref(), callback, result, Some(guard));
                }
            }
        });
    }
}

impl Drop for EncryptionOrchestrator {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Hands the outcome to the executor.
///
/// With a `slot`, the outcome is discarded if the task was cancelled before
/// the job ran; otherwise the slot is freed just before the callback runs.
fn dispatch(
    executor: &dyn CallbackExecutor,
    callback: Box<dyn EncryptCallback>,
    outcome: EncryptOutcome,
    slot: Option<SlotGuard>,
) {
    let job = Box::new(move || {
        if let Some(slot) = slot {
            if slot.token.is_cancelled() {
                debug!(task = slot.id, "discarding result of cancelled task");
                return;
            }
            drop(slot);
        }
        callback.deliver(outcome);
    });
    if let Err(e) = executor.execute(job) {
        warn!(error = %e, "encrypt callback could not be scheduled");
    }
}

fn join_fault(err: JoinError) -> EncryptException {
    let fault = if err.is_panic() {
        CseError::Fault(panic_message(err.into_panic().as_ref()))
    } else {
        CseError::Fault(err.to_string())
    };
    warn!(error = %fault, "encryption service faulted");
    EncryptException::with_cause(EncryptExceptionCode::UnknownException, fault)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}
