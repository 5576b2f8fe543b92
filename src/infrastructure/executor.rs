use crate::domain::ports::{CallbackExecutor, Job};
use crate::error::{CseError, Result};
use std::thread;
use tokio::sync::mpsc;
use tracing::debug;

pub const CALLBACK_THREAD_NAME: &str = "cse-callbacks";

/// Runs callbacks one by one on a dedicated OS thread.
///
/// Jobs are queued on an unbounded channel and executed in submission order,
/// so callbacks never run concurrently with each other and may block without
/// stalling the async runtime. The thread exits once every handle is dropped.
#[derive(Clone)]
pub struct SerialExecutor {
    jobs: mpsc::UnboundedSender<Job>,
}

impl SerialExecutor {
    pub fn start() -> Result<Self> {
        let (jobs, mut rx) = mpsc::unbounded_channel::<Job>();
        thread::Builder::new()
            .name(CALLBACK_THREAD_NAME.to_string())
            .spawn(move || {
                while let Some(job) = rx.blocking_recv() {
                    job();
                }
                debug!("callback executor stopped");
            })?;
        Ok(Self { jobs })
    }
}

impl CallbackExecutor for SerialExecutor {
    fn execute(&self, job: Job) -> Result<()> {
        self.jobs.send(job).map_err(|_| CseError::ExecutorClosed)
    }
}
